//! vocabcat-sim — Monte Carlo evaluation of the adaptive vocabulary test.
//!
//! Drives complete sessions through the public engine API with simulated
//! test-takers of known ability, in parallel and reproducibly, and reports
//! how well the engine recovers those abilities.

pub mod batch;
pub mod examinee;
pub mod runner;

pub use batch::{
    conditional_accuracy, exposure_from_runs, sample_thetas, simulate_batch,
    simulate_batch_with_progress, simulate_sequential, ConditionalAccuracy, NoopReporter,
    ProgressReporter, SimulationRun,
};
pub use examinee::SimulatedExaminee;
pub use runner::{run_session, run_session_with_exposure};

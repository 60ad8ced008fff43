//! vocabcat-core — Adaptive vocabulary-size test engine.
//!
//! Item bank loading, EAP ability estimation under the 3PL model,
//! information-maximizing item selection with content balancing, the
//! stopping rule and the per-round orchestrator. Everything here is a pure
//! in-process computation over an explicit session-state value.

pub mod config;
pub mod engine;
pub mod error;
pub mod estimation;
pub mod model;
pub mod parser;
pub mod report;
pub mod selection;
pub mod session;
pub mod statistics;
pub mod termination;
pub mod traits;

pub use config::{CatConfig, SelectionStrategy, VocabcatConfig};
pub use engine::{CatEngine, Round, RoundOutcome};
pub use error::CatError;
pub use estimation::{estimate, Estimate, ThetaGrid};
pub use model::{Item, ItemBank, ItemId, Level, NextItem};
pub use session::{RoundOutput, SessionState, SessionStatus};
pub use termination::{FinalResult, StopReason};
pub use traits::Examinee;

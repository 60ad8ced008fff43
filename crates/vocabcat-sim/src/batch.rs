//! Parallel batch simulation and accuracy statistics.
//!
//! Every (true ability, replication) pair gets its own generator seeded from
//! the batch seed and the pair's indices, so a batch reproduces exactly no
//! matter how rayon schedules it.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use vocabcat_core::report::SessionReport;
use vocabcat_core::statistics::ExposureTracker;
use vocabcat_core::{CatEngine, FinalResult, ItemBank};

use crate::examinee::SimulatedExaminee;
use crate::runner::{run_session, run_session_with_exposure};

/// One simulated session and the ability it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationRun {
    pub theta_index: usize,
    pub replication: usize,
    pub true_theta: f64,
    pub report: SessionReport,
}

/// Progress reporting for long batches.
pub trait ProgressReporter: Send + Sync {
    fn on_session_complete(&self, run: &SimulationRun);
    fn on_batch_complete(&self, sessions: usize, elapsed: Duration);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_session_complete(&self, _: &SimulationRun) {}
    fn on_batch_complete(&self, _: usize, _: Duration) {}
}

/// Seed of the generator for one (theta, replication) task.
pub fn task_seed(seed: u64, theta_index: usize, replication: usize) -> u64 {
    seed.wrapping_add(theta_index as u64 * 10_000)
        .wrapping_add(replication as u64)
}

/// Simulate `replications` sessions for every ability in `thetas`, in
/// parallel. Runs come back ordered by theta index, then replication.
pub fn simulate_batch(
    engine: &CatEngine,
    thetas: &[f64],
    replications: usize,
    seed: u64,
) -> Result<Vec<SimulationRun>> {
    simulate_batch_with_progress(engine, thetas, replications, seed, &NoopReporter)
}

pub fn simulate_batch_with_progress(
    engine: &CatEngine,
    thetas: &[f64],
    replications: usize,
    seed: u64,
    progress: &dyn ProgressReporter,
) -> Result<Vec<SimulationRun>> {
    let start = Instant::now();
    let tasks: Vec<(usize, usize)> = (0..thetas.len())
        .flat_map(|t| (0..replications).map(move |r| (t, r)))
        .collect();

    tracing::info!(
        thetas = thetas.len(),
        replications,
        sessions = tasks.len(),
        "starting simulation batch"
    );

    let runs = tasks
        .par_iter()
        .map(|&(theta_index, replication)| {
            let mut rng = Pcg64::seed_from_u64(task_seed(seed, theta_index, replication));
            let true_theta = thetas[theta_index];
            let mut examinee = SimulatedExaminee::new(true_theta);
            let report = run_session(engine, &mut examinee, &mut rng)
                .with_context(|| format!("simulation failed for theta {true_theta}"))?;
            let run = SimulationRun {
                theta_index,
                replication,
                true_theta,
                report,
            };
            progress.on_session_complete(&run);
            Ok(run)
        })
        .collect::<Result<Vec<_>>>()?;

    progress.on_batch_complete(runs.len(), start.elapsed());
    Ok(runs)
}

/// Simulate sessions one after another, sharing `tracker` so an
/// exposure-limited strategy sees the counts of every earlier session.
pub fn simulate_sequential(
    engine: &CatEngine,
    thetas: &[f64],
    replications: usize,
    seed: u64,
    tracker: &ExposureTracker,
) -> Result<Vec<SimulationRun>> {
    let mut runs = Vec::with_capacity(thetas.len() * replications);
    for (theta_index, &true_theta) in thetas.iter().enumerate() {
        for replication in 0..replications {
            let mut rng = Pcg64::seed_from_u64(task_seed(seed, theta_index, replication));
            let mut examinee = SimulatedExaminee::new(true_theta);
            let report = run_session_with_exposure(engine, &mut examinee, tracker, &mut rng)
                .with_context(|| format!("simulation failed for theta {true_theta}"))?;
            runs.push(SimulationRun {
                theta_index,
                replication,
                true_theta,
                report,
            });
        }
    }
    Ok(runs)
}

/// Rebuild exposure counts from finished runs.
pub fn exposure_from_runs(bank: &ItemBank, runs: &[SimulationRun]) -> ExposureTracker {
    let tracker = ExposureTracker::new(bank);
    for run in runs {
        tracker.record_session();
        for round in &run.report.rounds {
            tracker.record_response(round.item_id, round.response);
        }
    }
    tracker
}

/// Estimation accuracy at one true ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalAccuracy {
    pub true_theta: f64,
    /// Completed sessions aggregated.
    pub sessions: usize,
    pub mean_estimate: f64,
    /// Mean estimate minus true ability.
    pub bias: f64,
    /// Mean squared error of the estimate.
    pub mse: f64,
    pub mean_se: f64,
    pub mean_items: f64,
    pub mean_vocabulary_size: f64,
}

/// Aggregate runs per true ability, in theta-index order. Sessions without
/// a final result are skipped.
pub fn conditional_accuracy(runs: &[SimulationRun]) -> Vec<ConditionalAccuracy> {
    let Some(max_index) = runs.iter().map(|r| r.theta_index).max() else {
        return Vec::new();
    };

    (0..=max_index)
        .filter_map(|index| {
            let results: Vec<(f64, &FinalResult)> = runs
                .iter()
                .filter(|r| r.theta_index == index)
                .filter_map(|r| r.report.final_result.as_ref().map(|f| (r.true_theta, f)))
                .collect();
            let (true_theta, _) = *results.first()?;
            let n = results.len() as f64;
            let mean = |values: Vec<f64>| values.iter().sum::<f64>() / n;

            let mean_estimate = mean(results.iter().map(|(_, r)| r.final_theta).collect());
            Some(ConditionalAccuracy {
                true_theta,
                sessions: results.len(),
                mean_estimate,
                bias: mean_estimate - true_theta,
                mse: mean(
                    results
                        .iter()
                        .map(|(_, r)| (r.final_theta - true_theta).powi(2))
                        .collect(),
                ),
                mean_se: mean(results.iter().map(|(_, r)| r.final_se).collect()),
                mean_items: mean(
                    results
                        .iter()
                        .map(|(_, r)| r.items_administered as f64)
                        .collect(),
                ),
                mean_vocabulary_size: mean(
                    results
                        .iter()
                        .map(|(_, r)| r.vocabulary_size as f64)
                        .collect(),
                ),
            })
        })
        .collect()
}

/// Draw `n` abilities from a normal distribution.
pub fn sample_thetas(n: usize, mean: f64, sd: f64, seed: u64) -> Result<Vec<f64>> {
    let normal = Normal::new(mean, sd)
        .with_context(|| format!("invalid ability distribution N({mean}, {sd})"))?;
    let mut rng = Pcg64::seed_from_u64(seed);
    Ok((0..n).map(|_| normal.sample(&mut rng)).collect())
}

//! The `vocabcat simulate` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use vocabcat_core::statistics::{summarize_reports, ExposureTracker};
use vocabcat_core::SelectionStrategy;
use vocabcat_sim::{
    conditional_accuracy, exposure_from_runs, sample_thetas, simulate_batch_with_progress, simulate_sequential,
    ConditionalAccuracy, ProgressReporter, SimulationRun,
};

pub struct SimulateArgs {
    pub theta: Option<String>,
    pub sample: Option<usize>,
    pub mean: f64,
    pub sd: f64,
    pub replications: usize,
    pub seed: Option<u64>,
    pub output: Option<PathBuf>,
    pub format: String,
    pub item_bank: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_session_complete(&self, run: &SimulationRun) {
        tracing::debug!(
            theta = run.true_theta,
            replication = run.replication,
            items = run.report.rounds.len(),
            "session complete"
        );
    }

    fn on_batch_complete(&self, sessions: usize, elapsed: Duration) {
        eprintln!("Simulated {sessions} session(s) in {:.1}s", elapsed.as_secs_f64());
    }
}

pub fn execute(args: SimulateArgs) -> Result<()> {
    let (config, engine) = super::load_engine(args.item_bank, args.config)?;
    let seed = args.seed.or(config.seed).unwrap_or(42);

    let thetas = match (&args.theta, args.sample) {
        (Some(list), _) => parse_thetas(list)?,
        (None, Some(n)) => sample_thetas(n, args.mean, args.sd, seed)?,
        (None, None) => anyhow::bail!("either --theta or --sample is required"),
    };
    if thetas.is_empty() || args.replications == 0 {
        anyhow::bail!("nothing to simulate");
    }

    let runs = match engine.config().selection {
        SelectionStrategy::MaxInformation => {
            simulate_batch_with_progress(&engine, &thetas, args.replications, seed, &ConsoleReporter)?
        }
        // Exposure limits depend on earlier sessions, so run in order.
        SelectionStrategy::ExposureLimited { .. } => {
            let tracker = ExposureTracker::new(engine.bank());
            simulate_sequential(&engine, &thetas, args.replications, seed, &tracker)?
        }
    };

    if let Some(dir) = &args.output {
        for run in &runs {
            let path = dir.join(format!(
                "theta{:03}-rep{:03}-{}.json",
                run.theta_index, run.replication, run.report.id
            ));
            run.report.save_json(&path)?;
        }
        eprintln!("Wrote {} report(s) to {}", runs.len(), dir.display());
    }

    let accuracy = conditional_accuracy(&runs);
    let reports: Vec<_> = runs.iter().map(|r| r.report.clone()).collect();
    let summary = summarize_reports(&reports);
    let item_statistics = exposure_from_runs(engine.bank(), &runs).item_statistics(engine.bank());

    match args.format.as_str() {
        "json" => {
            let value = serde_json::json!({
                "seed": seed,
                "replications": args.replications,
                "conditional_accuracy": accuracy,
                "summary": summary,
                "item_statistics": item_statistics,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        _ => {
            print_accuracy(&accuracy);
            println!(
                "Sessions: {}  mean items: {:.1}  mean vocabulary size: {:.0}",
                summary.completed_sessions, summary.avg_items_administered, summary.avg_vocabulary_size
            );
            if let Some(top) = item_statistics.iter().max_by_key(|s| s.exposure_count) {
                println!(
                    "Most exposed item: {} \"{}\" ({} of {} sessions)",
                    top.item_id, top.word, top.exposure_count, summary.total_sessions
                );
            }
        }
    }

    Ok(())
}

fn parse_thetas(list: &str) -> Result<Vec<f64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .with_context(|| format!("invalid theta value: {s}"))
        })
        .collect()
}

fn print_accuracy(rows: &[ConditionalAccuracy]) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "True θ", "Sessions", "Mean θ̂", "Bias", "MSE", "Mean SE", "Items", "Vocabulary",
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(format!("{:.2}", row.true_theta)),
            Cell::new(row.sessions),
            Cell::new(format!("{:.3}", row.mean_estimate)),
            Cell::new(format!("{:+.3}", row.bias)),
            Cell::new(format!("{:.3}", row.mse)),
            Cell::new(format!("{:.3}", row.mean_se)),
            Cell::new(format!("{:.1}", row.mean_items)),
            Cell::new(format!("{:.0}", row.mean_vocabulary_size)),
        ]);
    }

    println!("{table}");
}

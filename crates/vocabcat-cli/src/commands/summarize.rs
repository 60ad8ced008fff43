//! The `vocabcat summarize` command.

use std::path::PathBuf;

use anyhow::Result;

use vocabcat_core::report::load_report_directory;
use vocabcat_core::statistics::{summarize_reports, SessionSummary};

pub fn execute(reports_dir: PathBuf, format: String) -> Result<()> {
    let reports = load_report_directory(&reports_dir)?;
    let summary = summarize_reports(&reports);

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print_summary(&summary),
    }

    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    use comfy_table::{Cell, Table};

    println!(
        "Sessions: {} ({} completed)",
        summary.total_sessions, summary.completed_sessions
    );
    println!("Average vocabulary size: {:.0}", summary.avg_vocabulary_size);
    println!("Average items administered: {:.1}", summary.avg_items_administered);
    println!("Average final SE: {:.3}", summary.avg_final_se);

    let mut table = Table::new();
    table.set_header(vec!["Vocabulary size", "Sessions"]);
    for bucket in &summary.distribution {
        table.add_row(vec![Cell::new(&bucket.range), Cell::new(bucket.count)]);
    }
    println!("{table}");
}

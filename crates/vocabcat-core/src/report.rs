//! Session reports with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Item, ItemId, Level};
use crate::session::se_serde;
use crate::termination::{FinalResult, StopReason};

/// A complete record of one test session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique session identifier.
    pub id: Uuid,
    /// Who took the test.
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// One entry per answered item, in order.
    #[serde(default)]
    pub rounds: Vec<RoundRecord>,
    #[serde(default)]
    pub final_result: Option<FinalResult>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

/// One answered item and the estimate it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub item_id: ItemId,
    pub word: String,
    pub level: Level,
    pub response: u8,
    pub theta_before: f64,
    pub theta_after: f64,
    #[serde(with = "se_serde")]
    pub se_after: f64,
    /// The option text the examinee chose, when answered by text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    /// Seconds taken to answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
}

impl SessionReport {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            started_at: Utc::now(),
            completed_at: None,
            rounds: Vec::new(),
            final_result: None,
            stop_reason: None,
        }
    }

    /// Append the outcome of answering `item`.
    pub fn record_round(
        &mut self,
        item: &Item,
        response: u8,
        theta_before: f64,
        theta_after: f64,
        se_after: f64,
    ) {
        self.rounds.push(RoundRecord {
            item_id: item.id,
            word: item.word.clone(),
            level: item.level,
            response,
            theta_before,
            theta_after,
            se_after,
            user_answer: None,
            response_time: None,
        });
    }

    /// Attach the chosen answer text and response time to the latest round.
    /// Does nothing before the first round.
    pub fn annotate_last_round(&mut self, user_answer: Option<String>, response_time: Option<f64>) {
        if let Some(last) = self.rounds.last_mut() {
            last.user_answer = user_answer;
            last.response_time = response_time;
        }
    }

    /// Mark the session completed.
    pub fn finish(&mut self, result: FinalResult, reason: StopReason) {
        self.final_result = Some(result);
        self.stop_reason = Some(reason);
        self.completed_at = Some(Utc::now());
    }

    pub fn is_completed(&self) -> bool {
        self.final_result.is_some()
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

/// Load every `.json` session report in a directory, recursively.
/// Files that fail to parse are skipped with a warning.
pub fn load_report_directory(dir: &Path) -> Result<Vec<SessionReport>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut reports = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            reports.extend(load_report_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "json") {
            match SessionReport::load_json(&path) {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!("skipping {}: {e:#}", path.display()),
            }
        }
    }
    Ok(reports)
}

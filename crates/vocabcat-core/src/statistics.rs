//! Item exposure tracking and aggregate session statistics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::model::{ItemBank, ItemId, Level};
use crate::report::SessionReport;

#[derive(Debug, Default)]
struct ItemCounters {
    exposures: AtomicU64,
    correct: AtomicU64,
}

/// Process-wide exposure counters, shared by all sessions.
///
/// The set of tracked items is fixed at construction, so recording only
/// touches atomics and never takes a lock. Responses to ids outside the
/// bank are ignored.
#[derive(Debug)]
pub struct ExposureTracker {
    items: HashMap<ItemId, ItemCounters>,
    sessions: AtomicU64,
}

impl ExposureTracker {
    pub fn new(bank: &ItemBank) -> Self {
        Self {
            items: bank
                .iter()
                .map(|item| (item.id, ItemCounters::default()))
                .collect(),
            sessions: AtomicU64::new(0),
        }
    }

    /// Count a started session.
    pub fn record_session(&self) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one presentation of `item_id` and whether it was answered
    /// correctly.
    pub fn record_response(&self, item_id: ItemId, response: u8) {
        if let Some(counters) = self.items.get(&item_id) {
            counters.exposures.fetch_add(1, Ordering::Relaxed);
            if response == 1 {
                counters.correct.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn sessions(&self) -> u64 {
        self.sessions.load(Ordering::Relaxed)
    }

    pub fn exposures(&self, item_id: ItemId) -> u64 {
        self.items
            .get(&item_id)
            .map(|c| c.exposures.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Point-in-time copy of the exposure counts, for selection.
    pub fn snapshot(&self) -> ExposureSnapshot {
        ExposureSnapshot {
            sessions: self.sessions(),
            exposures: self
                .items
                .iter()
                .map(|(&id, c)| (id, c.exposures.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Per-item usage statistics in bank order.
    pub fn item_statistics(&self, bank: &ItemBank) -> Vec<ItemStatistics> {
        bank.iter()
            .map(|item| {
                let (exposure_count, correct_count) = self
                    .items
                    .get(&item.id)
                    .map(|c| {
                        (
                            c.exposures.load(Ordering::Relaxed),
                            c.correct.load(Ordering::Relaxed),
                        )
                    })
                    .unwrap_or((0, 0));
                let p_value = if exposure_count == 0 {
                    0.0
                } else {
                    correct_count as f64 / exposure_count as f64
                };
                ItemStatistics {
                    item_id: item.id,
                    word: item.word.clone(),
                    level: item.level,
                    exposure_count,
                    correct_count,
                    p_value,
                    discrimination: item.discrimination,
                    difficulty: item.difficulty,
                    guessing: item.guessing,
                }
            })
            .collect()
    }
}

/// Frozen exposure counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    pub sessions: u64,
    pub exposures: HashMap<ItemId, u64>,
}

impl ExposureSnapshot {
    /// Fraction of sessions in which the item was presented.
    pub fn rate(&self, item_id: ItemId) -> f64 {
        if self.sessions == 0 {
            return 0.0;
        }
        let count = self.exposures.get(&item_id).copied().unwrap_or(0);
        count as f64 / self.sessions as f64
    }
}

/// Usage statistics for a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemStatistics {
    pub item_id: ItemId,
    pub word: String,
    pub level: Level,
    pub exposure_count: u64,
    pub correct_count: u64,
    /// Observed proportion correct (0 when never presented).
    pub p_value: f64,
    pub discrimination: f64,
    pub difficulty: f64,
    pub guessing: f64,
}

/// Labels of the vocabulary-size distribution buckets, in order.
pub const VOCABULARY_BUCKETS: [&str; 8] = [
    "0-999",
    "1000-1999",
    "2000-2999",
    "3000-3999",
    "4000-4999",
    "5000-5999",
    "6000-6999",
    "7000+",
];

/// Index into [`VOCABULARY_BUCKETS`] for a vocabulary size.
pub fn vocabulary_bucket(vocabulary_size: u64) -> usize {
    (vocabulary_size / 1000).min(7) as usize
}

/// Count of completed sessions in one vocabulary-size bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketCount {
    pub range: String,
    pub count: usize,
}

/// Aggregate statistics across session reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_sessions: usize,
    pub completed_sessions: usize,
    /// Mean vocabulary size of completed sessions (0 when none).
    pub avg_vocabulary_size: f64,
    /// Mean test length of completed sessions (0 when none).
    pub avg_items_administered: f64,
    /// Mean final standard error of completed sessions (0 when none).
    pub avg_final_se: f64,
    /// Always eight buckets, in [`VOCABULARY_BUCKETS`] order.
    pub distribution: Vec<BucketCount>,
}

/// Summarize a set of session reports.
pub fn summarize_reports(reports: &[SessionReport]) -> SessionSummary {
    let mut counts = [0usize; VOCABULARY_BUCKETS.len()];
    let mut vocab_sum = 0.0;
    let mut items_sum = 0.0;
    let mut se_sum = 0.0;
    let mut completed = 0usize;

    for result in reports.iter().filter_map(|r| r.final_result.as_ref()) {
        completed += 1;
        vocab_sum += result.vocabulary_size as f64;
        items_sum += result.items_administered as f64;
        if result.final_se.is_finite() {
            se_sum += result.final_se;
        }
        counts[vocabulary_bucket(result.vocabulary_size)] += 1;
    }

    let mean = |sum: f64| {
        if completed == 0 {
            0.0
        } else {
            sum / completed as f64
        }
    };

    SessionSummary {
        total_sessions: reports.len(),
        completed_sessions: completed,
        avg_vocabulary_size: mean(vocab_sum),
        avg_items_administered: mean(items_sum),
        avg_final_se: mean(se_sum),
        distribution: VOCABULARY_BUCKETS
            .iter()
            .zip(counts)
            .map(|(range, count)| BucketCount {
                range: (*range).to_string(),
                count,
            })
            .collect(),
    }
}

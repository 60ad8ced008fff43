//! Stopping rule and final scoring.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::CatConfig;
use crate::estimation::{logistic, Estimate};
use crate::session::se_serde;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Precision, length and content targets were all met.
    PrecisionReached,
    /// The hard item ceiling was reached.
    MaxItems,
    /// Every item in the bank has been administered.
    PoolExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::PrecisionReached => write!(f, "precision reached"),
            StopReason::MaxItems => write!(f, "maximum items reached"),
            StopReason::PoolExhausted => write!(f, "item pool exhausted"),
        }
    }
}

/// Outcome of evaluating the stopping rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

impl Decision {
    pub fn should_continue(self) -> bool {
        matches!(self, Decision::Continue)
    }
}

/// Frozen outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub final_theta: f64,
    #[serde(with = "se_serde")]
    pub final_se: f64,
    pub vocabulary_size: u64,
    pub items_administered: usize,
    /// `items_administered` over the full-test baseline.
    pub efficiency: f64,
}

/// Estimated vocabulary size for an ability: the expected number of known
/// words over the calibrated levels, 1000 words per level.
pub fn vocabulary_size(theta: f64, calibration: &[f64]) -> u64 {
    let total: f64 = calibration
        .iter()
        .map(|&difficulty| 1000.0 * logistic(theta - difficulty))
        .sum();
    total.round() as u64
}

/// Multi-criterion stopping rule.
#[derive(Debug, Clone)]
pub struct TerminationController {
    se_threshold: f64,
    min_items: usize,
    max_items: usize,
    required_high_count: usize,
    calibration: Vec<f64>,
    efficiency_baseline: f64,
}

impl TerminationController {
    pub fn new(config: &CatConfig) -> Self {
        Self {
            se_threshold: config.se_threshold,
            min_items: config.min_items,
            max_items: config.max_items,
            required_high_count: config.required_high_count,
            calibration: config.vocab_calibration_table.clone(),
            efficiency_baseline: config.efficiency_baseline,
        }
    }

    /// Decide whether the session goes on after an ability update.
    ///
    /// Continue while precision, length or content targets are unmet, but
    /// never at or beyond `max_items`.
    pub fn decide(&self, administered: usize, se: f64, high_level_count: usize) -> Decision {
        if administered >= self.max_items {
            return Decision::Stop(StopReason::MaxItems);
        }
        let unmet = se > self.se_threshold
            || administered < self.min_items
            || high_level_count < self.required_high_count;
        if unmet {
            Decision::Continue
        } else {
            Decision::Stop(StopReason::PrecisionReached)
        }
    }

    /// Freeze the final result for a stopped session.
    pub fn finalize(&self, estimate: Estimate, items_administered: usize) -> FinalResult {
        FinalResult {
            final_theta: estimate.theta,
            final_se: estimate.se,
            vocabulary_size: vocabulary_size(estimate.theta, &self.calibration),
            items_administered,
            efficiency: items_administered as f64 / self.efficiency_baseline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_VOCAB_CALIBRATION;

    fn controller() -> TerminationController {
        TerminationController::new(&CatConfig::default())
    }

    #[test]
    fn continues_below_min_items_regardless_of_se() {
        let c = controller();
        for n in 0..20 {
            assert_eq!(c.decide(n, 0.01, 5), Decision::Continue, "n={n}");
        }
    }

    #[test]
    fn stops_at_max_items_regardless_of_targets() {
        let c = controller();
        assert_eq!(c.decide(30, 0.9, 0), Decision::Stop(StopReason::MaxItems));
        assert_eq!(c.decide(30, f64::INFINITY, 1), Decision::Stop(StopReason::MaxItems));
        assert_eq!(c.decide(31, 0.1, 3), Decision::Stop(StopReason::MaxItems));
    }

    #[test]
    fn stops_when_all_targets_met() {
        let c = controller();
        assert_eq!(
            c.decide(20, 0.4, 2),
            Decision::Stop(StopReason::PrecisionReached)
        );
        assert_eq!(c.decide(20, 0.41, 2), Decision::Continue);
        assert_eq!(c.decide(25, 0.3, 1), Decision::Continue);
    }

    #[test]
    fn vocabulary_size_at_reference_points() {
        let table = DEFAULT_VOCAB_CALIBRATION;
        // theta = 0: sum of logistic(-d) * 1000 over the table.
        let expected: f64 = table.iter().map(|d| 1000.0 / (1.0 + d.exp())).sum();
        let got = vocabulary_size(0.0, &table) as f64;
        assert!((got - expected).abs() <= 0.5 + 1e-9, "{got} vs {expected}");
        assert!(vocabulary_size(-10.0, &table) < 10);
        assert!(vocabulary_size(10.0, &table) > 7990);
        assert!(vocabulary_size(1.0, &table) > vocabulary_size(0.5, &table));
    }

    #[test]
    fn finalize_computes_efficiency() {
        let result = controller().finalize(
            Estimate {
                theta: 0.3,
                se: 0.38,
            },
            24,
        );
        assert_eq!(result.items_administered, 24);
        assert!((result.efficiency - 0.15).abs() < 1e-12);
        assert_eq!(result.final_theta, 0.3);
        assert_eq!(
            result.vocabulary_size,
            vocabulary_size(0.3, &DEFAULT_VOCAB_CALIBRATION)
        );
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&StopReason::PoolExhausted).unwrap();
        assert_eq!(json, "\"pool_exhausted\"");
    }
}

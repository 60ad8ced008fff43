//! Engine configuration and config-file loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CatError;
use crate::estimation::MAX_GRID_POINTS;
use crate::model::Level;

/// Calibration difficulties of the eight vocabulary levels, used to turn a
/// final ability estimate into a vocabulary size.
pub const DEFAULT_VOCAB_CALIBRATION: [f64; 8] =
    [-2.206, -1.512, -0.701, -0.075, 0.748, 1.152, 1.504, 2.089];

/// How the next item is chosen from the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Maximum Fisher information, exposure counters ignored.
    #[default]
    MaxInformation,
    /// Maximum Fisher information among items whose exposure rate does not
    /// exceed `max_rate`. Only applies when the caller supplies exposure
    /// counts.
    ExposureLimited { max_rate: f64 },
}

/// Every tunable of the adaptive test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatConfig {
    /// Lower edge of the ability grid.
    pub theta_grid_min: f64,
    /// Upper edge of the ability grid.
    pub theta_grid_max: f64,
    /// Grid spacing.
    pub theta_grid_step: f64,
    /// Stop once the standard error drops to this value (other criteria permitting).
    pub se_threshold: f64,
    /// Never stop before this many items.
    pub min_items: usize,
    /// Always stop at this many items.
    pub max_items: usize,
    /// Items at or above this level count as high-level for content balancing.
    pub high_level_threshold: Level,
    /// Minimum number of high-level items per session.
    pub required_high_count: usize,
    /// Levels the first item is drawn from.
    pub initial_level_band: Vec<Level>,
    /// Per-level calibration difficulties for the vocabulary-size score.
    pub vocab_calibration_table: Vec<f64>,
    /// Item count of the full, non-adaptive test (efficiency denominator).
    pub efficiency_baseline: f64,
    /// Selection strategy.
    pub selection: SelectionStrategy,
}

impl Default for CatConfig {
    fn default() -> Self {
        Self {
            theta_grid_min: -4.0,
            theta_grid_max: 4.0,
            theta_grid_step: 0.01,
            se_threshold: 0.4,
            min_items: 20,
            max_items: 30,
            high_level_threshold: 7,
            required_high_count: 2,
            initial_level_band: vec![3, 4, 5],
            vocab_calibration_table: DEFAULT_VOCAB_CALIBRATION.to_vec(),
            efficiency_baseline: 160.0,
            selection: SelectionStrategy::MaxInformation,
        }
    }
}

impl CatConfig {
    /// Reject configurations no engine can run with.
    pub fn validate(&self) -> Result<(), CatError> {
        let fail = |msg: String| -> Result<(), CatError> { Err(CatError::Configuration(msg)) };

        if !(self.theta_grid_min.is_finite() && self.theta_grid_max.is_finite()) {
            return fail("theta grid bounds must be finite".into());
        }
        if self.theta_grid_max <= self.theta_grid_min {
            return fail(format!(
                "theta_grid_max ({}) must exceed theta_grid_min ({})",
                self.theta_grid_max, self.theta_grid_min
            ));
        }
        if !(self.theta_grid_step.is_finite() && self.theta_grid_step > 0.0) {
            return fail(format!(
                "theta_grid_step must be > 0, got {}",
                self.theta_grid_step
            ));
        }
        if self.theta_grid_step > self.theta_grid_max - self.theta_grid_min {
            return fail("theta grid must contain at least 2 points".into());
        }
        let span = self.theta_grid_max - self.theta_grid_min;
        let points = (span / self.theta_grid_step).round() + 1.0;
        if points > MAX_GRID_POINTS as f64 {
            return fail(format!(
                "theta grid would have {points} points, at most {MAX_GRID_POINTS} allowed"
            ));
        }
        if !(self.se_threshold.is_finite() && self.se_threshold > 0.0) {
            return fail(format!("se_threshold must be > 0, got {}", self.se_threshold));
        }
        if self.max_items == 0 {
            return fail("max_items must be at least 1".into());
        }
        if self.min_items > self.max_items {
            return fail(format!(
                "min_items ({}) must not exceed max_items ({})",
                self.min_items, self.max_items
            ));
        }
        if self.initial_level_band.is_empty() {
            return fail("initial_level_band must name at least one level".into());
        }
        if self.vocab_calibration_table.is_empty()
            || self.vocab_calibration_table.iter().any(|d| !d.is_finite())
        {
            return fail("vocab_calibration_table must hold finite values".into());
        }
        if !(self.efficiency_baseline.is_finite() && self.efficiency_baseline > 0.0) {
            return fail(format!(
                "efficiency_baseline must be > 0, got {}",
                self.efficiency_baseline
            ));
        }
        if let SelectionStrategy::ExposureLimited { max_rate } = self.selection {
            if !(max_rate > 0.0 && max_rate <= 1.0) {
                return fail(format!("exposure max_rate must be in (0, 1], got {max_rate}"));
            }
        }
        Ok(())
    }
}

/// Top-level vocabcat configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabcatConfig {
    /// Item bank CSV.
    #[serde(default = "default_item_bank")]
    pub item_bank: PathBuf,
    /// Where session reports are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Fixed seed for the engine's random source (replayable sessions).
    #[serde(default)]
    pub seed: Option<u64>,
    /// Engine settings.
    #[serde(default)]
    pub cat: CatConfig,
}

fn default_item_bank() -> PathBuf {
    PathBuf::from("item_bank.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./vocabcat-results")
}

impl Default for VocabcatConfig {
    fn default() -> Self {
        Self {
            item_bank: default_item_bank(),
            output_dir: default_output_dir(),
            seed: None,
            cat: CatConfig::default(),
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `vocabcat.toml` in the current directory
/// 2. `~/.config/vocabcat/config.toml`
///
/// `VOCABCAT_ITEM_BANK` overrides the item bank path.
pub fn load_config() -> Result<VocabcatConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<VocabcatConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("vocabcat.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => VocabcatConfig::default(),
    };

    if let Ok(bank) = std::env::var("VOCABCAT_ITEM_BANK") {
        if !bank.is_empty() {
            config.item_bank = PathBuf::from(bank);
        }
    }

    Ok(config)
}

/// Parse and validate a TOML configuration document.
pub fn parse_config_str(content: &str) -> Result<VocabcatConfig> {
    let config: VocabcatConfig = toml::from_str(content)?;
    config.cat.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("vocabcat"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let config = CatConfig::default();
        assert_eq!(config.theta_grid_min, -4.0);
        assert_eq!(config.theta_grid_max, 4.0);
        assert_eq!(config.theta_grid_step, 0.01);
        assert_eq!(config.se_threshold, 0.4);
        assert_eq!(config.min_items, 20);
        assert_eq!(config.max_items, 30);
        assert_eq!(config.high_level_threshold, 7);
        assert_eq!(config.required_high_count, 2);
        assert_eq!(config.initial_level_band, vec![3, 4, 5]);
        assert_eq!(config.vocab_calibration_table.len(), 8);
        assert_eq!(config.efficiency_baseline, 160.0);
        assert_eq!(config.selection, SelectionStrategy::MaxInformation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_item_limits() {
        let config = CatConfig {
            min_items: 31,
            ..CatConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_items"));
    }

    #[test]
    fn validate_rejects_bad_grid() {
        let config = CatConfig {
            theta_grid_step: 0.0,
            ..CatConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CatConfig {
            theta_grid_min: 1.0,
            theta_grid_max: 1.0,
            ..CatConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CatConfig {
            theta_grid_step: 1e-10,
            ..CatConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at most 100001"), "{err}");
    }

    #[test]
    fn validate_rejects_bad_exposure_rate() {
        let config = CatConfig {
            selection: SelectionStrategy::ExposureLimited { max_rate: 1.5 },
            ..CatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
item_bank = "data/bank.csv"
seed = 42

[cat]
max_items = 25
se_threshold = 0.35

[cat.selection]
type = "exposure_limited"
max_rate = 0.25
"#;
        let config = parse_config_str(toml_str).unwrap();
        assert_eq!(config.item_bank, PathBuf::from("data/bank.csv"));
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.cat.max_items, 25);
        assert_eq!(config.cat.min_items, 20);
        assert_eq!(config.cat.se_threshold, 0.35);
        assert_eq!(
            config.cat.selection,
            SelectionStrategy::ExposureLimited { max_rate: 0.25 }
        );
    }

    #[test]
    fn parse_rejects_invalid_values() {
        let toml_str = r#"
[cat]
min_items = 40
"#;
        assert!(parse_config_str(toml_str).is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocabcat.toml");
        std::fs::write(&path, "[cat]\nmin_items = 5\nmax_items = 10\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.cat.min_items, 5);
        assert_eq!(config.cat.max_items, 10);
    }
}

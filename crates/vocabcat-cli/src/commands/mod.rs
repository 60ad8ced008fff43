pub mod answer;
pub mod init;
pub mod simulate;
pub mod start;
pub mod summarize;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_pcg::Pcg64;

use vocabcat_core::config::{load_config_from, VocabcatConfig};
use vocabcat_core::parser::load_item_bank;
use vocabcat_core::CatEngine;

/// Load configuration, apply the `--item-bank` override and build an engine.
pub(crate) fn load_engine(
    item_bank: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<(VocabcatConfig, CatEngine)> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(path) = item_bank {
        config.item_bank = path;
    }
    let bank = load_bank(&config.item_bank)?;
    let engine = CatEngine::new(Arc::new(bank), config.cat.clone())
        .context("invalid engine configuration")?;
    Ok((config, engine))
}

pub(crate) fn load_bank(path: &Path) -> Result<vocabcat_core::ItemBank> {
    load_item_bank(path).with_context(|| format!("failed to load item bank {}", path.display()))
}

/// Random source for a command: the given seed, the configured seed, or a
/// fresh one. The seed is logged so any session can be replayed.
pub(crate) fn make_rng(seed: Option<u64>, config: &VocabcatConfig) -> Pcg64 {
    let seed = seed.or(config.seed).unwrap_or_else(rand::random);
    tracing::debug!(seed, "random source seeded");
    Pcg64::seed_from_u64(seed)
}

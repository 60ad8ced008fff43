//! The `vocabcat validate` command.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;

use vocabcat_core::config::load_config_from;
use vocabcat_core::parser::validate_item_bank;

pub fn execute(item_bank: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let path = item_bank.unwrap_or(config.item_bank);
    let bank = super::load_bank(&path)?;

    println!("Item bank: {} ({} items)", path.display(), bank.len());

    let mut per_level: BTreeMap<u8, usize> = BTreeMap::new();
    for item in &bank {
        *per_level.entry(item.level).or_default() += 1;
    }
    let levels: Vec<String> = per_level
        .iter()
        .map(|(level, count)| format!("L{level}: {count}"))
        .collect();
    println!("Levels: {}", levels.join(", "));

    let warnings = validate_item_bank(&bank, &config.cat);
    for w in &warnings {
        let prefix = w
            .item_id
            .map(|id| format!("  [{id}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }

    if warnings.is_empty() {
        println!("Item bank valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}

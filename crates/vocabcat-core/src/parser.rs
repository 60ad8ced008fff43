//! CSV item bank parser.
//!
//! Loads an item bank from a headed CSV file and validates it. Structural
//! problems (missing columns, bad parameter ranges, duplicate ids) are
//! fatal; suspicious-but-usable content is reported as warnings.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::config::CatConfig;
use crate::error::{CatError, Result};
use crate::model::{Item, ItemBank, ItemId, Level};

/// One CSV row, named after the bank's column headers.
#[derive(Debug, Deserialize)]
struct CsvItemRow {
    #[serde(rename = "ItemId")]
    item_id: ItemId,
    #[serde(rename = "Level")]
    level: Level,
    #[serde(rename = "Item")]
    word: String,
    #[serde(rename = "PartOfSpeech", default)]
    part_of_speech: Option<String>,
    #[serde(rename = "CorrectAnswer")]
    correct_answer: String,
    #[serde(rename = "Distractor_1", default)]
    distractor_1: Option<String>,
    #[serde(rename = "Distractor_2", default)]
    distractor_2: Option<String>,
    #[serde(rename = "Distractor_3", default)]
    distractor_3: Option<String>,
    #[serde(rename = "Discrimination", alias = "Dscrimination")]
    discrimination: f64,
    #[serde(rename = "Difficulty")]
    difficulty: f64,
    #[serde(rename = "Guessing")]
    guessing: f64,
}

impl From<CsvItemRow> for Item {
    fn from(row: CsvItemRow) -> Self {
        Item {
            id: row.item_id,
            level: row.level,
            word: row.word,
            part_of_speech: row.part_of_speech.unwrap_or_default(),
            correct_answer: row.correct_answer,
            distractors: [
                row.distractor_1.unwrap_or_default(),
                row.distractor_2.unwrap_or_default(),
                row.distractor_3.unwrap_or_default(),
            ],
            discrimination: row.discrimination,
            difficulty: row.difficulty,
            guessing: row.guessing,
        }
    }
}

/// Load and validate an item bank from a CSV file.
pub fn load_item_bank(path: &Path) -> Result<ItemBank> {
    let file = std::fs::File::open(path).map_err(|e| {
        CatError::config(format!("failed to read item bank {}: {e}", path.display()))
    })?;
    let bank = parse_item_bank_reader(file).map_err(|e| match e {
        CatError::Configuration(msg) => CatError::config(format!("{}: {msg}", path.display())),
        other => other,
    })?;
    tracing::info!(
        items = bank.len(),
        levels = bank.levels().len(),
        "loaded item bank from {}",
        path.display()
    );
    Ok(bank)
}

/// Parse an item bank from CSV text (useful for testing).
pub fn parse_item_bank_str(content: &str) -> Result<ItemBank> {
    parse_item_bank_reader(content.as_bytes())
}

/// Parse an item bank from any CSV source.
pub fn parse_item_bank_reader<R: Read>(reader: R) -> Result<ItemBank> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut items = Vec::new();
    for (row, record) in csv_reader.deserialize::<CsvItemRow>().enumerate() {
        // Header is line 1.
        let record =
            record.map_err(|e| CatError::config(format!("row {}: {e}", row + 2)))?;
        items.push(Item::from(record));
    }

    ItemBank::from_items(items)
}

/// A non-fatal finding about an item bank.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The item concerned, if any.
    pub item_id: Option<ItemId>,
    /// Warning message.
    pub message: String,
}

/// Check a loaded bank against the engine configuration for problems that
/// do not prevent a session from running.
pub fn validate_item_bank(bank: &ItemBank, config: &CatConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.filter(&config.initial_level_band).is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: format!(
                "no items in initial level band {:?}; first item will be drawn from the whole bank",
                config.initial_level_band
            ),
        });
    }

    let high = bank.at_or_above(config.high_level_threshold).len();
    if high < config.required_high_count {
        warnings.push(ValidationWarning {
            item_id: None,
            message: format!(
                "only {high} item(s) at level {} or above, {} required per session",
                config.high_level_threshold, config.required_high_count
            ),
        });
    }

    if bank.len() < config.max_items {
        warnings.push(ValidationWarning {
            item_id: None,
            message: format!(
                "bank has {} items but sessions may run to {}",
                bank.len(),
                config.max_items
            ),
        });
    }

    for item in bank {
        let correct = item.correct_answer.trim();
        if item.distractors.iter().any(|d| d.trim() == correct) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id),
                message: "a distractor equals the correct answer".into(),
            });
        }

        let distinct: HashSet<&str> = item.distractors.iter().map(|d| d.trim()).collect();
        if distinct.len() < item.distractors.len() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id),
                message: "distractors are not distinct".into(),
            });
        }
    }

    warnings
}

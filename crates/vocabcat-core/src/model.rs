//! Core data model types for vocabcat.
//!
//! An [`ItemBank`] is the immutable catalogue of calibrated vocabulary items
//! every session draws from. It is built once at startup and then shared
//! read-only (typically behind an `Arc`) by all sessions.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{CatError, Result};

/// Item identifier, as found in the `ItemId` column of the bank.
pub type ItemId = u32;

/// Ordinal difficulty tier of an item (1 = easiest).
pub type Level = u8;

/// Number of wrong options shown alongside the correct answer.
pub const DISTRACTOR_COUNT: usize = 3;

/// A single calibrated test item under the 3PL model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier within the bank.
    pub id: ItemId,
    /// Difficulty tier.
    pub level: Level,
    /// The word being tested.
    pub word: String,
    /// Part of speech, informational only.
    #[serde(default)]
    pub part_of_speech: String,
    /// The correct option text.
    pub correct_answer: String,
    /// Exactly three wrong options.
    pub distractors: [String; DISTRACTOR_COUNT],
    /// Discrimination `a` (> 0).
    pub discrimination: f64,
    /// Difficulty `b`.
    pub difficulty: f64,
    /// Pseudo-guessing `c` in [0, 1).
    pub guessing: f64,
}

impl Item {
    /// Check the parameter ranges and option texts required for the item to
    /// take part in estimation and selection.
    pub fn check(&self) -> Result<()> {
        let id = self.id;
        if !(self.discrimination.is_finite() && self.discrimination > 0.0) {
            return Err(CatError::config(format!(
                "item {id}: discrimination must be > 0, got {}",
                self.discrimination
            )));
        }
        if !self.difficulty.is_finite() {
            return Err(CatError::config(format!(
                "item {id}: difficulty must be finite, got {}",
                self.difficulty
            )));
        }
        if !(0.0..1.0).contains(&self.guessing) {
            return Err(CatError::config(format!(
                "item {id}: guessing must be in [0, 1), got {}",
                self.guessing
            )));
        }
        if self.correct_answer.trim().is_empty() {
            return Err(CatError::config(format!(
                "item {id}: correct answer is empty"
            )));
        }
        if let Some(pos) = self.distractors.iter().position(|d| d.trim().is_empty()) {
            return Err(CatError::config(format!(
                "item {id}: distractor {} is missing",
                pos + 1
            )));
        }
        Ok(())
    }

    /// Score a free-text answer: 1 if it matches the correct answer, else 0.
    pub fn score(&self, answer: &str) -> u8 {
        u8::from(answer.trim() == self.correct_answer.trim())
    }
}

/// Ordered, immutable collection of items keyed by id.
///
/// Iteration order is the load order of the source file, which is also the
/// tie-break order used by item selection.
#[derive(Debug, Clone)]
pub struct ItemBank {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl ItemBank {
    /// Build a bank from already-parsed items, validating every item and
    /// rejecting duplicate ids or an empty bank.
    pub fn from_items(items: Vec<Item>) -> Result<Self> {
        if items.is_empty() {
            return Err(CatError::config("item bank is empty"));
        }

        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            item.check()?;
            if index.insert(item.id, pos).is_some() {
                return Err(CatError::config(format!("duplicate item id: {}", item.id)));
            }
        }

        Ok(Self { items, index })
    }

    /// Look up an item by id.
    pub fn by_id(&self, id: ItemId) -> Option<&Item> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    /// Position of an item in bank order.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Items whose level is in `levels`, in bank order.
    pub fn filter(&self, levels: &[Level]) -> Vec<&Item> {
        let wanted: HashSet<Level> = levels.iter().copied().collect();
        self.items
            .iter()
            .filter(|item| wanted.contains(&item.level))
            .collect()
    }

    /// Items at or above `threshold`, in bank order.
    pub fn at_or_above(&self, threshold: Level) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| item.level >= threshold)
            .collect()
    }

    /// All item ids in bank order.
    pub fn all_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Iterate over items in bank order.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Distinct levels present in the bank, ascending.
    pub fn levels(&self) -> Vec<Level> {
        let mut levels: Vec<Level> = self.items.iter().map(|item| item.level).collect();
        levels.sort_unstable();
        levels.dedup();
        levels
    }
}

impl<'a> IntoIterator for &'a ItemBank {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// The item presented to the test-taker next, as handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextItem {
    pub id: ItemId,
    pub word: String,
    pub level: Level,
    pub correct_answer: String,
    pub distractors: [String; DISTRACTOR_COUNT],
}

impl NextItem {
    /// The four answer options (correct answer plus distractors) in random
    /// order.
    pub fn shuffled_options<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<String> {
        let mut options = Vec::with_capacity(DISTRACTOR_COUNT + 1);
        options.push(self.correct_answer.clone());
        options.extend(self.distractors.iter().cloned());
        options.shuffle(rng);
        options
    }
}

impl From<&Item> for NextItem {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            word: item.word.clone(),
            level: item.level,
            correct_answer: item.correct_answer.clone(),
            distractors: item.distractors.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build an item with the given parameters and placeholder texts.
    pub fn item(id: ItemId, level: Level, a: f64, b: f64, c: f64) -> Item {
        Item {
            id,
            level,
            word: format!("word{id}"),
            part_of_speech: "noun".into(),
            correct_answer: format!("answer{id}"),
            distractors: [
                format!("wrong{id}a"),
                format!("wrong{id}b"),
                format!("wrong{id}c"),
            ],
            discrimination: a,
            difficulty: b,
            guessing: c,
        }
    }

    /// A bank with `per_level` items on each of levels 1..=8, difficulty
    /// rising with level. Ids are assigned in bank order starting at 1.
    pub fn graded_bank(per_level: u32) -> ItemBank {
        let mut items = Vec::new();
        let mut id = 1;
        for level in 1..=8u8 {
            for k in 0..per_level {
                let b = -2.5 + 0.65 * f64::from(level - 1) + 0.05 * f64::from(k);
                let a = 0.9 + 0.1 * f64::from(k % 5);
                items.push(item(id, level, a, b, 0.2));
                id += 1;
            }
        }
        ItemBank::from_items(items).unwrap()
    }
}

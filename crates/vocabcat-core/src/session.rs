//! Session state and the per-round wire contract.
//!
//! Callers store the state between rounds however they like (cookies,
//! databases, JSON files). Storage layers are known to collapse one-element
//! arrays into bare scalars and to turn `+inf` into `null`, so every
//! deserialization here normalizes both back before the engine sees the
//! value.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CatError, Result};
use crate::model::{ItemBank, ItemId, NextItem};
use crate::termination::FinalResult;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    InProgress,
    Completed,
}

/// Everything the engine needs to resume a session.
///
/// A new value is produced every round; the engine never mutates one in
/// place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Item ids in presentation order, without repeats.
    #[serde(default, deserialize_with = "one_or_many")]
    pub administered_items: Vec<ItemId>,
    /// Scored responses (0 or 1), index-aligned with `administered_items`.
    #[serde(default, deserialize_with = "one_or_many")]
    pub responses: Vec<u8>,
    /// Current ability estimate.
    #[serde(default)]
    pub theta: f64,
    /// Current standard error; `+inf` before the first response.
    #[serde(default = "infinite_se", with = "se_serde")]
    pub se: f64,
    #[serde(default)]
    pub status: SessionStatus,
    /// The item most recently handed out and awaiting an answer.
    #[serde(default)]
    pub pending_item: Option<ItemId>,
}

fn infinite_se() -> f64 {
    f64::INFINITY
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    /// An empty, in-progress session.
    pub fn new() -> Self {
        Self {
            administered_items: Vec::new(),
            responses: Vec::new(),
            theta: 0.0,
            se: f64::INFINITY,
            status: SessionStatus::InProgress,
            pending_item: None,
        }
    }

    pub fn items_count(&self) -> usize {
        self.administered_items.len()
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Check the structural invariants against `bank`: equal lengths, no
    /// repeated or unknown ids, responses in {0, 1}.
    pub fn validate(&self, bank: &ItemBank) -> Result<()> {
        if self.administered_items.len() != self.responses.len() {
            return Err(CatError::validation(format!(
                "session has {} administered items but {} responses",
                self.administered_items.len(),
                self.responses.len()
            )));
        }

        let mut seen = HashSet::with_capacity(self.administered_items.len());
        for &id in &self.administered_items {
            if bank.by_id(id).is_none() {
                return Err(CatError::validation(format!("unknown item id in session: {id}")));
            }
            if !seen.insert(id) {
                return Err(CatError::validation(format!("item {id} administered twice")));
            }
        }

        if let Some(bad) = self.responses.iter().find(|&&r| r > 1) {
            return Err(CatError::validation(format!(
                "response must be 0 or 1, got {bad}"
            )));
        }

        if let Some(id) = self.pending_item {
            if bank.by_id(id).is_none() {
                return Err(CatError::validation(format!("unknown pending item id: {id}")));
            }
            if self.administered_items.contains(&id) {
                return Err(CatError::validation(format!(
                    "pending item {id} was already administered"
                )));
            }
        }

        Ok(())
    }
}

/// The object returned to the surrounding application after every round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutput {
    pub current_theta: f64,
    #[serde(with = "se_serde")]
    pub current_se: f64,
    pub items_count: usize,
    pub should_continue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_item: Option<NextItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<FinalResult>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub administered_items: Vec<ItemId>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub responses: Vec<u8>,
}

impl RoundOutput {
    /// Rebuild the session state a caller stored as a round output.
    pub fn into_state(self) -> SessionState {
        SessionState {
            administered_items: self.administered_items,
            responses: self.responses,
            theta: self.current_theta,
            se: self.current_se,
            status: if self.should_continue {
                SessionStatus::InProgress
            } else {
                SessionStatus::Completed
            },
            pending_item: self.next_item.map(|item| item.id),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept a sequence, a bare scalar (one-element sequence collapsed by a
/// storage layer) or `null` (empty).
pub fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value: Option<OneOrMany<T>> = Option::deserialize(deserializer)?;
    Ok(match value {
        None => Vec::new(),
        Some(OneOrMany::One(v)) => vec![v],
        Some(OneOrMany::Many(vs)) => vs,
    })
}

/// Standard-error (de)serialization: non-finite values are written as
/// `null`; `null`, `"Inf"` and `"Infinity"` read back as `+inf`.
pub mod se_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(f64::INFINITY),
            Some(Raw::Number(v)) => Ok(v),
            Some(Raw::Text(s)) => match s.trim() {
                "Inf" | "inf" | "Infinity" | "+Inf" => Ok(f64::INFINITY),
                other => other
                    .parse::<f64>()
                    .map_err(|_| D::Error::custom(format!("invalid standard error: {other}"))),
            },
        }
    }
}

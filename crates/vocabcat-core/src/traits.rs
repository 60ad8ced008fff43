//! Seams between the engine and whoever answers its items.

use rand::Rng;

use crate::model::Item;

/// Anything that can answer a test item: a simulated test-taker in batch
/// evaluation, or a scripted responder in tests.
pub trait Examinee {
    /// Scored response to `item`: 1 correct, 0 incorrect.
    fn respond<R: Rng + ?Sized>(&mut self, item: &Item, rng: &mut R) -> u8;
}

/// Replays a fixed response sequence, then answers incorrectly.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExaminee {
    responses: Vec<u8>,
    cursor: usize,
}

impl ScriptedExaminee {
    pub fn new(responses: impl Into<Vec<u8>>) -> Self {
        Self {
            responses: responses.into(),
            cursor: 0,
        }
    }
}

impl Examinee for ScriptedExaminee {
    fn respond<R: Rng + ?Sized>(&mut self, _item: &Item, _rng: &mut R) -> u8 {
        let response = self.responses.get(self.cursor).copied().unwrap_or(0);
        self.cursor += 1;
        response
    }
}

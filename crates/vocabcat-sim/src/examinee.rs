//! Simulated test-takers.

use rand::Rng;
use vocabcat_core::estimation::prob_correct;
use vocabcat_core::model::Item;
use vocabcat_core::Examinee;

/// A test-taker of known ability who answers according to the 3PL model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedExaminee {
    pub true_theta: f64,
}

impl SimulatedExaminee {
    pub fn new(true_theta: f64) -> Self {
        Self { true_theta }
    }
}

impl Examinee for SimulatedExaminee {
    fn respond<R: Rng + ?Sized>(&mut self, item: &Item, rng: &mut R) -> u8 {
        let p = prob_correct(item, self.true_theta);
        u8::from(rng.random::<f64>() < p)
    }
}

//! Round orchestrator.
//!
//! Sequences estimation, the stopping rule and item selection for one
//! round. The engine holds only immutable data (bank, configuration, grid),
//! so one instance can serve any number of concurrent sessions; all
//! per-session history travels in the [`SessionState`] value.

use std::sync::Arc;

use rand::Rng;

use crate::config::CatConfig;
use crate::error::{CatError, Result};
use crate::estimation::{estimate, ThetaGrid};
use crate::model::{ItemBank, ItemId, NextItem};
use crate::selection::{high_level_count, ItemSelector, SelectionBasis};
use crate::session::{RoundOutput, SessionState, SessionStatus};
use crate::statistics::ExposureSnapshot;
use crate::termination::{Decision, FinalResult, StopReason, TerminationController};

/// What a round produced besides the new state.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// The session goes on with this item.
    Next {
        item: NextItem,
        basis: SelectionBasis,
    },
    /// The session is over.
    Finished {
        result: FinalResult,
        reason: StopReason,
    },
}

/// The new session state and the outcome of one round.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub state: SessionState,
    pub outcome: RoundOutcome,
}

impl Round {
    pub fn should_continue(&self) -> bool {
        matches!(self.outcome, RoundOutcome::Next { .. })
    }

    pub fn next_item(&self) -> Option<&NextItem> {
        match &self.outcome {
            RoundOutcome::Next { item, .. } => Some(item),
            RoundOutcome::Finished { .. } => None,
        }
    }

    pub fn final_result(&self) -> Option<&FinalResult> {
        match &self.outcome {
            RoundOutcome::Finished { result, .. } => Some(result),
            RoundOutcome::Next { .. } => None,
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match &self.outcome {
            RoundOutcome::Finished { reason, .. } => Some(*reason),
            RoundOutcome::Next { .. } => None,
        }
    }

    /// The per-round object handed to the surrounding application.
    pub fn to_output(&self) -> RoundOutput {
        RoundOutput {
            current_theta: self.state.theta,
            current_se: self.state.se,
            items_count: self.state.items_count(),
            should_continue: self.should_continue(),
            next_item: self.next_item().cloned(),
            final_result: self.final_result().cloned(),
            administered_items: self.state.administered_items.clone(),
            responses: self.state.responses.clone(),
        }
    }
}

/// The adaptive test engine.
#[derive(Debug, Clone)]
pub struct CatEngine {
    bank: Arc<ItemBank>,
    config: CatConfig,
    grid: ThetaGrid,
    selector: ItemSelector,
    termination: TerminationController,
}

impl CatEngine {
    /// Build an engine, rejecting invalid configurations up front.
    pub fn new(bank: Arc<ItemBank>, config: CatConfig) -> Result<Self> {
        config.validate()?;
        let grid = ThetaGrid::from_config(&config)?;
        Ok(Self {
            selector: ItemSelector::new(&config),
            termination: TerminationController::new(&config),
            bank,
            config,
            grid,
        })
    }

    pub fn bank(&self) -> &ItemBank {
        &self.bank
    }

    pub fn config(&self) -> &CatConfig {
        &self.config
    }

    pub fn grid(&self) -> &ThetaGrid {
        &self.grid
    }

    /// Begin a session: empty history, first item drawn from the initial band.
    pub fn start<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Round> {
        self.estimate_and_select(&SessionState::new(), None, rng)
    }

    /// Record a scored response and run one round.
    ///
    /// On error the caller's state is untouched; it is only ever read.
    pub fn submit<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        item_id: ItemId,
        response: u8,
        rng: &mut R,
    ) -> Result<Round> {
        let next = self.append(state, item_id, response)?;
        self.estimate_and_select(&next, None, rng)
    }

    /// Like [`submit`](Self::submit), with exposure counts available to an
    /// exposure-limited selection strategy.
    pub fn submit_with_exposure<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        item_id: ItemId,
        response: u8,
        exposure: &ExposureSnapshot,
        rng: &mut R,
    ) -> Result<Round> {
        let next = self.append(state, item_id, response)?;
        self.estimate_and_select(&next, Some(exposure), rng)
    }

    /// Score an answer text against the item's key, then submit it.
    pub fn submit_answer<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        item_id: ItemId,
        answer: &str,
        rng: &mut R,
    ) -> Result<Round> {
        let item = self
            .bank
            .by_id(item_id)
            .ok_or_else(|| CatError::validation(format!("unknown item id: {item_id}")))?;
        self.submit(state, item_id, item.score(answer), rng)
    }

    /// Recompute the estimate from the full history, apply the stopping
    /// rule and, when continuing, select the next item.
    ///
    /// An empty history yields the no-data estimate and the initial draw;
    /// any other history goes through the same path regardless of length.
    pub fn estimate_and_select<R: Rng + ?Sized>(
        &self,
        state: &SessionState,
        exposure: Option<&ExposureSnapshot>,
        rng: &mut R,
    ) -> Result<Round> {
        state.validate(&self.bank)?;

        let administered = &state.administered_items;
        let est = estimate(&self.grid, administered, &state.responses, &self.bank)?;
        let high = high_level_count(administered, &self.bank, self.config.high_level_threshold);

        let decision = self.termination.decide(administered.len(), est.se, high);
        let selection = match decision {
            Decision::Continue => {
                self.selector
                    .select(&self.bank, administered, est.theta, exposure, rng)
            }
            Decision::Stop(_) => None,
        };

        let mut next_state = SessionState {
            administered_items: administered.clone(),
            responses: state.responses.clone(),
            theta: est.theta,
            se: est.se,
            status: SessionStatus::InProgress,
            pending_item: None,
        };

        let outcome = match selection {
            Some(sel) => {
                tracing::debug!(
                    items = administered.len(),
                    theta = est.theta,
                    se = est.se,
                    next = sel.item.id,
                    "selected next item"
                );
                next_state.pending_item = Some(sel.item.id);
                RoundOutcome::Next {
                    item: NextItem::from(sel.item),
                    basis: sel.basis,
                }
            }
            None => {
                let reason = match decision {
                    Decision::Stop(reason) => reason,
                    // Nothing left to select.
                    Decision::Continue => StopReason::PoolExhausted,
                };
                let result = self.termination.finalize(est, administered.len());
                tracing::info!(
                    items = result.items_administered,
                    theta = result.final_theta,
                    se = result.final_se,
                    vocabulary_size = result.vocabulary_size,
                    %reason,
                    "session finished"
                );
                next_state.status = SessionStatus::Completed;
                RoundOutcome::Finished { result, reason }
            }
        };

        Ok(Round {
            state: next_state,
            outcome,
        })
    }

    /// Validate a submission and build the extended history.
    fn append(&self, state: &SessionState, item_id: ItemId, response: u8) -> Result<SessionState> {
        if response > 1 {
            return Err(CatError::validation(format!(
                "response must be 0 or 1, got {response}"
            )));
        }
        if state.is_completed() {
            return Err(CatError::validation("session is already completed"));
        }
        state.validate(&self.bank)?;
        if self.bank.by_id(item_id).is_none() {
            return Err(CatError::validation(format!("unknown item id: {item_id}")));
        }
        if state.administered_items.contains(&item_id) {
            return Err(CatError::validation(format!(
                "item {item_id} was already administered"
            )));
        }
        if let Some(pending) = state.pending_item {
            if pending != item_id {
                return Err(CatError::validation(format!(
                    "answer is for item {item_id} but item {pending} is pending"
                )));
            }
        }

        let mut next = state.clone();
        next.administered_items.push(item_id);
        next.responses.push(response);
        next.pending_item = None;
        Ok(next)
    }
}

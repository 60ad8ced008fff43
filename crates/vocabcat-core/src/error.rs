//! Engine error types.
//!
//! Every failure the CAT engine can report falls into one of three kinds:
//! a broken item bank or configuration, a bad request against an otherwise
//! healthy engine, or a numeric breakdown in the posterior computation.

use thiserror::Error;

/// Errors raised by the CAT engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatError {
    /// The item bank or engine configuration is malformed. No engine may start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A request (response value, item id, session state) was rejected.
    /// The caller's session state is left untouched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The posterior over the ability grid could not be normalized.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),
}

impl CatError {
    /// Returns `true` if the engine itself is unusable, as opposed to a
    /// single request having been rejected.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CatError::Configuration(_) | CatError::NumericalInstability(_)
        )
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        CatError::Configuration(msg.into())
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        CatError::Validation(msg.into())
    }
}

/// Result alias used throughout the engine.
pub type Result<T, E = CatError> = std::result::Result<T, E>;

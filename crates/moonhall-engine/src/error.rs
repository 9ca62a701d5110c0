//! Error types for the engine.

use thiserror::Error;

/// Errors produced by game-state transitions.
///
/// `Validation` and `Configuration` are reported to the caller with no
/// mutation applied. `Concurrency` marks a duplicate transition attempt
/// the losing caller should absorb as a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Illegal target, wrong phase, ability already used, and the like.
    #[error("invalid action: {0}")]
    Validation(String),

    /// The session cannot start as configured.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A transition raced another and lost; safe to ignore.
    #[error("concurrent transition rejected: {0}")]
    Concurrency(String),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Validation`] error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

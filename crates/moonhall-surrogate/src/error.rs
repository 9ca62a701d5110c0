//! Error types for the completion collaborator.

use thiserror::Error;

/// The text-completion service was unreachable or returned something
/// unusable. Never surfaced to players — the surrogate's deterministic
/// fallback covers every decision.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion returned status {0}")]
    Status(u16),

    #[error("completion reply was unusable: {0}")]
    Unusable(String),
}

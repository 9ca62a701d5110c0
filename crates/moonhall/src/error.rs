//! Unified error type for the Moonhall service.

use moonhall_engine::EngineError;
use moonhall_protocol::RoomId;
use moonhall_store::StoreError;

/// Top-level error that wraps the crate-specific errors.
///
/// Callers of [`crate::GameService`] deal with this single type; the
/// `#[from]` attributes let `?` convert sub-crate errors automatically.
/// Collaborator errors are absent on purpose — the surrogate's fallback
/// recovers them locally and they never reach a caller.
#[derive(Debug, thiserror::Error)]
pub enum MoonhallError {
    /// A game-rule error (validation, configuration, concurrency).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A persistence error that outlived its retries.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The session does not exist or has expired.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),
}

impl MoonhallError {
    /// True for errors a caller should treat as "try again or rejoin",
    /// not as a bug: a rejected action or a vanished room.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Engine(EngineError::Validation(_))
                | Self::Engine(EngineError::Configuration(_))
                | Self::RoomNotFound(_)
        )
    }
}

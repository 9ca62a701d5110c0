//! Error types for the store layer.

use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or answered too slowly.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored document could not be serialized or parsed.
    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// All retry attempts were exhausted; the last persisted state
    /// remains authoritative.
    #[error("store gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

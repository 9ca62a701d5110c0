//! Session persistence for Moonhall.
//!
//! One serialized room document per session, an append-only public
//! message log, and per-participant private logs — each with expiry, so
//! abandoned sessions are reclaimed without bookkeeping.
//!
//! # Key types
//!
//! - [`RoomStore`] — the async persistence trait the core talks to
//! - [`MemoryStore`] — in-process implementation with TTL
//! - [`with_retries`] — the bounded-retry wrapper for store operations
//! - [`StoreError`] — persistence failures

mod error;
mod memory;
mod retry;
mod store;

pub use error::StoreError;
pub use memory::{DEFAULT_TTL, MemoryStore};
pub use retry::{RetryPolicy, with_retries};
pub use store::RoomStore;

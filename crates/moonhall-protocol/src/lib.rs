//! Wire types for Moonhall.
//!
//! Everything that crosses a boundary lives here: participant and room
//! ids, the closed [`Action`] enum players submit, message records for
//! the public and private logs, and the [`Event`] envelope the core
//! pushes out to collaborators.
//!
//! # Key types
//!
//! - [`RoomId`], [`ParticipantId`] — newtype ids
//! - [`Action`] — every inbound game action, one variant per kind
//! - [`MessageRecord`] — one entry in a public or private log
//! - [`Event`] — the outbound envelope ("room_update", "public_message",
//!   "private_message")

mod action;
mod types;

pub use action::{Action, WitchChoice};
pub use types::{Event, MessageKind, MessageRecord, ParticipantId, RoomId};

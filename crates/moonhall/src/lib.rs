//! # Moonhall
//!
//! A backend for concurrent werewolf sessions mixing human players and
//! LLM-driven surrogates, narrated by an external language-model host.
//!
//! The [`GameService`] is the entry point: it owns the persistence,
//! broadcast, and text-completion seams and exposes the inbound
//! operations (`create_room`, `join`, `start`, `submit_action`,
//! `poll`). Rooms are independent; each mutation re-reads the latest
//! persisted document, applies one engine transition, and persists the
//! result. Timers are opportunistic: a phase ends at the first check
//! after its duration, triggered by a poll or by the service's own
//! scheduled nudge.

mod broadcast;
mod error;
mod service;

pub use broadcast::{Broadcaster, ChannelBroadcaster, NullBroadcaster, OutboundEnvelope};
pub use error::MoonhallError;
pub use service::GameService;

pub use moonhall_engine::{GameConfig, SystemClock};
pub use moonhall_protocol::{Action, Event, ParticipantId, RoomId, WitchChoice};
pub use moonhall_store::MemoryStore;
pub use moonhall_surrogate::{HttpCompletion, TextCompletion};

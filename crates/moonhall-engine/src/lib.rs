//! The Moonhall game engine.
//!
//! One [`Room`] is one werewolf session. Everything in this crate is a
//! pure state transition over a `Room`: callers load the latest
//! persisted document, apply exactly one transition, and persist the
//! result. Transitions return the messages they produced as
//! `(Audience, MessageRecord)` pairs; delivering them is the caller's
//! problem.
//!
//! # Key modules
//!
//! - [`role`] — the role table and [`role::assign_roles`]
//! - [`room`] — the session data model and its invariants
//! - [`night`] — the ordered night sub-phase machine and its resolution
//! - [`vote`] — day ballots and the tie-break rule
//! - [`chain`] — death-triggered abilities (hunter revenge) and last words
//! - [`clock`] — phase timing and the [`clock::Clock`] seam
//! - [`flow`] — the phase transitions tying it all together

pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod flow;
pub mod night;
pub mod role;
pub mod room;
pub mod vote;

pub use clock::{Clock, SystemClock};
pub use config::GameConfig;
pub use error::EngineError;
pub use flow::{Audience, Outbound};
pub use night::{NightRecord, NightStep};
pub use role::Role;
pub use room::{DeathCause, Participant, Phase, ResolutionKind, Room, Winner};

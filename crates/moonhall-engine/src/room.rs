//! The session data model and its invariants.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use moonhall_protocol::{ParticipantId, RoomId};

use crate::night::NightRecord;
use crate::role::Role;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a session. Exactly one is active at a time.
///
/// ```text
/// Waiting → RoleReveal → Night → Resolution → Day → Voting → Resolution → Night → …
///                                                                  ↘ Ended
/// ```
///
/// Resolution is entered twice per round: once to convert night actions
/// into deaths, once to convert ballots into an elimination. Both exits
/// run the ability chain and last words before normal play resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    RoleReveal,
    Night,
    Day,
    Voting,
    Resolution,
    Ended,
}

impl Phase {
    /// Phases with a fixed duration; Waiting and Ended sit idle until
    /// an explicit trigger or store expiry reclaims the room.
    pub fn is_timed(self) -> bool {
        !matches!(self, Self::Waiting | Self::Ended)
    }

    /// Whether the game is running (roles dealt, not yet decided).
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Waiting | Self::Ended)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Waiting => "waiting",
            Self::RoleReveal => "role_reveal",
            Self::Night => "night",
            Self::Day => "day",
            Self::Voting => "voting",
            Self::Resolution => "resolution",
            Self::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// How a participant died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathCause {
    Wolf,
    Vote,
    Poison,
    Hunter,
}

/// The winning camp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Wolves,
    Villagers,
}

/// One seat at the table. Created on join, mutated for the rest of the
/// session, never deleted — dead participants stay in the roster.
///
/// Invariants: `alive` never flips back to true; the `*_used` ability
/// flags never reset once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    /// Computer-controlled seat whose actions come from the surrogate actor.
    pub surrogate: bool,
    // Single-use abilities, monotonic.
    pub antidote_used: bool,
    pub poison_used: bool,
    pub revenge_used: bool,
    // Per-night flags, cleared when a new night begins.
    pub guarded_tonight: bool,
    pub checked_tonight: bool,
    /// The guardian's previous-night target (no-repeat rule).
    pub last_guard_target: Option<ParticipantId>,
    pub died_by: Option<DeathCause>,
}

impl Participant {
    pub fn new(id: ParticipantId, name: impl Into<String>, surrogate: bool) -> Self {
        Self {
            id,
            name: name.into(),
            role: None,
            alive: true,
            surrogate,
            antidote_used: false,
            poison_used: false,
            revenge_used: false,
            guarded_tonight: false,
            checked_tonight: false,
            last_guard_target: None,
            died_by: None,
        }
    }

    /// True if this participant is alive and holds `role`.
    pub fn is_living(&self, role: Role) -> bool {
        self.alive && self.role == Some(role)
    }
}

// ---------------------------------------------------------------------------
// Resolution sub-state
// ---------------------------------------------------------------------------

/// What a Resolution phase is converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Night actions → deaths, then Day.
    NightOutcome,
    /// Ballots → elimination, then Night.
    VoteOutcome,
}

/// Suspended-progression state while death-triggered abilities and last
/// words play out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionState {
    pub kind: ResolutionKind,
    /// A dead hunter who still owes the room a revenge shot.
    pub pending_revenge: Option<ParticipantId>,
    /// Newly dead participants who have not yet spoken their last words.
    pub last_words: Vec<ParticipantId>,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session: the single authoritative document persisted per
/// room id. Mutations follow read-latest → one transition → persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    /// Seat order is join order and never changes.
    pub participants: Vec<Participant>,
    pub phase: Phase,
    pub day_count: u32,
    pub night_count: u32,
    /// Scratch record, present only from Night through its Resolution.
    pub night: Option<NightRecord>,
    /// Ballots for the current Voting phase, voter → target.
    pub ballots: BTreeMap<ParticipantId, ParticipantId>,
    pub phase_start: DateTime<Utc>,
    /// Current phase duration in seconds; 0 for untimed phases.
    pub phase_duration_secs: u64,
    pub speaking_allowed: bool,
    pub winner: Option<Winner>,
    /// Bumped on every phase transition. Background tasks carry the
    /// generation they were spawned under and no-op when it is stale.
    pub generation: u64,
    /// In-progress marker that rejects duplicate resolution attempts.
    pub resolving: bool,
    pub resolution: Option<ResolutionState>,
}

impl Room {
    /// A fresh, empty session in Waiting.
    pub fn new(id: RoomId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            participants: Vec::new(),
            phase: Phase::Waiting,
            day_count: 0,
            night_count: 0,
            night: None,
            ballots: BTreeMap::new(),
            phase_start: now,
            phase_duration_secs: 0,
            speaking_allowed: false,
            winner: None,
            generation: 0,
            resolving: false,
            resolution: None,
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    pub fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == id)
    }

    /// Display name for host messages; falls back to the raw id.
    pub fn name_of(&self, id: &ParticipantId) -> String {
        self.participant(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn living(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.alive)
    }

    pub fn living_with_role(&self, role: Role) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(move |p| p.is_living(role))
    }

    pub fn has_living(&self, role: Role) -> bool {
        self.living_with_role(role).next().is_some()
    }

    /// Marks a participant dead. Returns false (and applies nothing) if
    /// the participant is missing or already dead — the alive flag is
    /// monotonic, so a second death never overwrites the first cause.
    pub fn kill(&mut self, id: &ParticipantId, cause: DeathCause) -> bool {
        match self.participant_mut(id) {
            Some(p) if p.alive => {
                p.alive = false;
                p.died_by = Some(cause);
                true
            }
            _ => false,
        }
    }

    /// Enters `phase`, resets the clock, and bumps the generation so
    /// any task scheduled against the previous phase goes stale.
    pub fn set_phase(&mut self, phase: Phase, now: DateTime<Utc>, duration_secs: u64) {
        self.phase = phase;
        self.phase_start = now;
        self.phase_duration_secs = duration_secs;
        self.generation += 1;
    }

    /// The winning camp, if the game is decided: no wolves left, or
    /// wolves at numeric parity with everyone else.
    pub fn decided_winner(&self) -> Option<Winner> {
        let wolves = self.living().filter(|p| p.role == Some(Role::Wolf)).count();
        let others = self.living().filter(|p| p.role != Some(Role::Wolf)).count();
        if wolves == 0 {
            Some(Winner::Villagers)
        } else if wolves >= others {
            Some(Winner::Wolves)
        } else {
            None
        }
    }

    /// Full snapshot for the "room_update" event.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("room serializes")
    }
}

//! Ids, message records, and the outbound event envelope.
//!
//! These are the structures that get serialized to JSON and handed to
//! the transport collaborator or appended to the session's message
//! logs, so their serde shapes are part of the contract and tested
//! below.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a game session.
///
/// Newtype over a short random code so a `RoomId` can never be confused
/// with a `ParticipantId` in a signature. `#[serde(transparent)]` keeps
/// the JSON representation a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    /// Generates a fresh 8-character room code.
    pub fn generate() -> Self {
        let full = uuid::Uuid::new_v4().simple().to_string();
        Self(full[..8].to_string())
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A unique identifier for a participant (human or surrogate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Message records
// ---------------------------------------------------------------------------

/// What kind of entry a [`MessageRecord`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Host announcement visible to the whole room.
    System,
    /// A participant's day-phase statement.
    Speech,
    /// Private role reveal at game start.
    Identity,
    /// Private seer inspection result.
    SeerResult,
    /// Private prompt asking a participant to act.
    Prompt,
    /// A dying participant's final statement.
    LastWords,
}

/// One entry in a public or private message log.
///
/// `speaker`/`speaker_name` are set for participant-authored entries
/// (speech, last words) and omitted from the JSON for host messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speaker: Option<ParticipantId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speaker_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl MessageRecord {
    /// A host announcement.
    pub fn system(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::System,
            speaker: None,
            speaker_name: None,
            content: content.into(),
            timestamp,
        }
    }

    /// A participant-authored entry of the given kind.
    pub fn spoken(
        kind: MessageKind,
        speaker: ParticipantId,
        speaker_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            speaker: Some(speaker),
            speaker_name: Some(speaker_name.into()),
            content: content.into(),
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Event — the outbound envelope
// ---------------------------------------------------------------------------

/// An outbound event pushed to the broadcast collaborator.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, so a room
/// snapshot goes out as `{ "type": "room_update", "room": { ... } }`.
///
/// The room snapshot rides as raw [`serde_json::Value`]: the envelope is
/// deliberately opaque to the session state's concrete type, the same
/// way a transport frame is opaque to its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Full session snapshot after a state change.
    RoomUpdate { room: serde_json::Value },
    /// A new entry in the public log.
    PublicMessage { message: MessageRecord },
    /// A new entry in one participant's private log.
    PrivateMessage { message: MessageRecord },
}

// =========================================================================
// Tests
// =========================================================================

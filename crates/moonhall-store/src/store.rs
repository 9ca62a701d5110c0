//! The persistence trait.

use async_trait::async_trait;

use moonhall_protocol::{MessageRecord, ParticipantId, RoomId};

use crate::error::StoreError;

/// Persistence seam for session state.
///
/// The layout mirrors the deployed keyspace: `room:{id}` holds the one
/// authoritative room document, `room:{id}:messages` the public log,
/// and `room:{id}:private:{participant}` each private log. Every key
/// carries the store's TTL and is refreshed on write, so an idle
/// session expires as a unit.
///
/// Room documents travel as [`serde_json::Value`] — the store is a
/// leaf and does not know the engine's model.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Writes (or overwrites) the room document and refreshes its TTL.
    async fn put_room(&self, id: &RoomId, doc: &serde_json::Value) -> Result<(), StoreError>;

    /// Reads the latest room document, or `None` if absent or expired.
    async fn get_room(&self, id: &RoomId) -> Result<Option<serde_json::Value>, StoreError>;

    /// Removes the room document and all its message logs.
    async fn delete_room(&self, id: &RoomId) -> Result<(), StoreError>;

    /// Appends to the room's public log.
    async fn append_public(&self, id: &RoomId, message: &MessageRecord)
    -> Result<(), StoreError>;

    /// The full public log, oldest first.
    async fn public_messages(&self, id: &RoomId) -> Result<Vec<MessageRecord>, StoreError>;

    /// Appends to one participant's private log.
    async fn append_private(
        &self,
        id: &RoomId,
        participant: &ParticipantId,
        message: &MessageRecord,
    ) -> Result<(), StoreError>;

    /// One participant's private log, oldest first.
    async fn private_messages(
        &self,
        id: &RoomId,
        participant: &ParticipantId,
    ) -> Result<Vec<MessageRecord>, StoreError>;
}

//! In-process store with TTL expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use moonhall_protocol::{MessageRecord, ParticipantId, RoomId};

use crate::error::StoreError;
use crate::store::RoomStore;

/// Default TTL, matching the deployed store's one-hour expiry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// An in-process [`RoomStore`].
///
/// Every write refreshes the key's deadline; reads treat an expired
/// entry as absent. Suitable for single-instance deployments and tests —
/// a shared external store drops in behind the same trait for anything
/// bigger.
pub struct MemoryStore {
    ttl: Duration,
    docs: RwLock<HashMap<String, Entry<serde_json::Value>>>,
    logs: RwLock<HashMap<String, Entry<Vec<MessageRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            docs: RwLock::new(HashMap::new()),
            logs: RwLock::new(HashMap::new()),
        }
    }

    fn room_key(id: &RoomId) -> String {
        format!("room:{id}")
    }

    fn public_key(id: &RoomId) -> String {
        format!("room:{id}:messages")
    }

    fn private_key(id: &RoomId, participant: &ParticipantId) -> String {
        format!("room:{id}:private:{participant}")
    }

    async fn append_log(&self, key: String, message: &MessageRecord) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut logs = self.logs.write().await;
        let entry = logs.entry(key).or_insert_with(|| Entry {
            value: Vec::new(),
            expires_at: now + self.ttl,
        });
        if !entry.live(now) {
            entry.value.clear();
        }
        entry.value.push(message.clone());
        entry.expires_at = now + self.ttl;
        Ok(())
    }

    async fn read_log(&self, key: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let now = Instant::now();
        let logs = self.logs.read().await;
        Ok(logs
            .get(key)
            .filter(|e| e.live(now))
            .map(|e| e.value.clone())
            .unwrap_or_default())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn put_room(&self, id: &RoomId, doc: &serde_json::Value) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        docs.insert(
            Self::room_key(id),
            Entry {
                value: doc.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn get_room(&self, id: &RoomId) -> Result<Option<serde_json::Value>, StoreError> {
        let now = Instant::now();
        let docs = self.docs.read().await;
        Ok(docs
            .get(&Self::room_key(id))
            .filter(|e| e.live(now))
            .map(|e| e.value.clone()))
    }

    async fn delete_room(&self, id: &RoomId) -> Result<(), StoreError> {
        let prefix = format!("room:{id}");
        self.docs.write().await.remove(&Self::room_key(id));
        self.logs
            .write()
            .await
            .retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn append_public(
        &self,
        id: &RoomId,
        message: &MessageRecord,
    ) -> Result<(), StoreError> {
        self.append_log(Self::public_key(id), message).await
    }

    async fn public_messages(&self, id: &RoomId) -> Result<Vec<MessageRecord>, StoreError> {
        self.read_log(&Self::public_key(id)).await
    }

    async fn append_private(
        &self,
        id: &RoomId,
        participant: &ParticipantId,
        message: &MessageRecord,
    ) -> Result<(), StoreError> {
        self.append_log(Self::private_key(id, participant), message)
            .await
    }

    async fn private_messages(
        &self,
        id: &RoomId,
        participant: &ParticipantId,
    ) -> Result<Vec<MessageRecord>, StoreError> {
        self.read_log(&Self::private_key(id, participant)).await
    }
}

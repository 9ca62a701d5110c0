//! The outbound event seam.
//!
//! The transport layer is an external collaborator; the core hands it
//! events through this trait and never waits on it. Implementations
//! must not block — the channel implementation is unbounded and drops
//! silently when the receiver is gone, the same way a disconnected
//! player's messages are dropped.

use async_trait::async_trait;
use tokio::sync::mpsc;

use moonhall_protocol::{Event, ParticipantId, RoomId};

/// Receives outbound public and private events from the core.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Public state for everyone in the room.
    async fn broadcast(&self, room: &RoomId, event: Event);

    /// Private state for one participant (role reveal, seer result,
    /// prompts).
    async fn deliver(&self, room: &RoomId, participant: &ParticipantId, event: Event);
}

/// One outbound event with its addressing. `recipient: None` is a
/// room-wide broadcast.
#[derive(Debug, Clone)]
pub struct OutboundEnvelope {
    pub room: RoomId,
    pub recipient: Option<ParticipantId>,
    pub event: Event,
}

/// Forwards events into an unbounded channel for a transport layer to
/// drain. Cheap to clone; never blocks the core.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    tx: mpsc::UnboundedSender<OutboundEnvelope>,
}

impl ChannelBroadcaster {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn broadcast(&self, room: &RoomId, event: Event) {
        let _ = self.tx.send(OutboundEnvelope {
            room: room.clone(),
            recipient: None,
            event,
        });
    }

    async fn deliver(&self, room: &RoomId, participant: &ParticipantId, event: Event) {
        let _ = self.tx.send(OutboundEnvelope {
            room: room.clone(),
            recipient: Some(participant.clone()),
            event,
        });
    }
}

/// Swallows everything. For tests and headless tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

#[async_trait]
impl Broadcaster for NullBroadcaster {
    async fn broadcast(&self, _room: &RoomId, _event: Event) {}
    async fn deliver(&self, _room: &RoomId, _participant: &ParticipantId, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_broadcaster_forwards_with_addressing() {
        let (tx, mut rx) = ChannelBroadcaster::new();
        let room = RoomId::from("r1");
        let alice = ParticipantId::from("alice");

        tx.broadcast(&room, Event::RoomUpdate { room: serde_json::json!({}) })
            .await;
        tx.deliver(
            &room,
            &alice,
            Event::RoomUpdate { room: serde_json::json!({}) },
        )
        .await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.recipient, None);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.recipient, Some(alice));
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_block_or_panic() {
        let (tx, rx) = ChannelBroadcaster::new();
        drop(rx);
        tx.broadcast(
            &RoomId::from("r1"),
            Event::RoomUpdate { room: serde_json::json!({}) },
        )
        .await;
    }
}

//! Per-user publish/subscribe fan-out.
//!
//! [`MessageBus`] keeps one `tokio::sync::broadcast` channel per
//! `(organization_id, user_id)` pair. Chat messages and delivery-status
//! updates addressed to a user are published to exactly that user's channel;
//! every live connection the user has (phone plus desktop, say) holds its
//! own subscription. Designed to be shared via `Arc<MessageBus>`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use muster_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

// ---------------------------------------------------------------------------
// ChannelKey / ChannelEvent
// ---------------------------------------------------------------------------

/// Identifies the channel owned by one user within one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub organization_id: DbId,
    pub user_id: DbId,
}

impl ChannelKey {
    pub fn new(organization_id: DbId, user_id: DbId) -> Self {
        Self {
            organization_id,
            user_id,
        }
    }
}

/// What a channel envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelEventKind {
    /// A chat message addressed to the channel owner.
    ChatMessage,
    /// A status change for a message the channel owner sent.
    ChatStatus,
    /// A delivery/response update for an alert involving the channel owner.
    AlertUpdate,
}

/// Opaque JSON envelope delivered on a user channel.
///
/// The payload is the serialized entity (chat message or delivery record);
/// the bus never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub kind: ChannelEventKind,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl ChannelEvent {
    pub fn new(kind: ChannelEventKind, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// MessageBus
// ---------------------------------------------------------------------------

/// Buffer capacity of each per-user broadcast channel.
///
/// When a subscriber lags past this many buffered events it observes a
/// `RecvError::Lagged` and skips ahead.
const CHANNEL_CAPACITY: usize = 256;

/// Keyed fan-out bus: one broadcast channel per `(organization, user)`.
///
/// Subscriptions come and go with client connections, so the registry
/// supports concurrent subscribe/unsubscribe; publishing to a key with no
/// channel is a cheap no-op that reports zero receivers.
pub struct MessageBus {
    channels: RwLock<HashMap<ChannelKey, broadcast::Sender<ChannelEvent>>>,
}

impl MessageBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to all events addressed to `key`, creating the channel on
    /// first use.
    pub async fn subscribe(&self, key: ChannelKey) -> broadcast::Receiver<ChannelEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to `key`'s channel.
    ///
    /// Returns the number of live subscribers that received it. Zero means
    /// nobody is connected for that user right now, and callers use it to
    /// fall back to a push notification.
    pub async fn publish(&self, key: ChannelKey, event: ChannelEvent) -> usize {
        let channels = self.channels.read().await;
        match channels.get(&key) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Drop `key`'s channel if its last subscriber is gone.
    ///
    /// Called by connection handlers on disconnect so the registry does not
    /// accumulate dead channels.
    pub async fn prune(&self, key: ChannelKey) {
        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(&key) {
            if sender.receiver_count() == 0 {
                channels.remove(&key);
            }
        }
    }

    /// Number of channels currently registered.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: i64) -> ChannelEvent {
        ChannelEvent::new(ChannelEventKind::ChatMessage, serde_json::json!({ "n": n }))
    }

    #[tokio::test]
    async fn publish_without_subscribers_reports_zero() {
        let bus = MessageBus::new();

        let delivered = bus.publish(ChannelKey::new(1, 2), event(0)).await;

        assert_eq!(delivered, 0);
        assert_eq!(bus.channel_count().await, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_events_for_its_key_only() {
        let bus = MessageBus::new();
        let key = ChannelKey::new(1, 2);
        let other = ChannelKey::new(1, 3);

        let mut rx = bus.subscribe(key).await;
        let mut other_rx = bus.subscribe(other).await;

        let delivered = bus.publish(key, event(7)).await;
        assert_eq!(delivered, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.payload["n"], 7);

        // The other user's channel stays quiet.
        assert!(matches!(
            other_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn every_connection_of_a_user_receives_the_event() {
        let bus = MessageBus::new();
        let key = ChannelKey::new(1, 2);

        let mut phone = bus.subscribe(key).await;
        let mut desktop = bus.subscribe(key).await;

        let delivered = bus.publish(key, event(1)).await;
        assert_eq!(delivered, 2);

        assert_eq!(phone.recv().await.unwrap().payload["n"], 1);
        assert_eq!(desktop.recv().await.unwrap().payload["n"], 1);
    }

    #[tokio::test]
    async fn prune_removes_abandoned_channels() {
        let bus = MessageBus::new();
        let key = ChannelKey::new(1, 2);

        let rx = bus.subscribe(key).await;
        assert_eq!(bus.channel_count().await, 1);

        // Still subscribed: prune keeps the channel.
        bus.prune(key).await;
        assert_eq!(bus.channel_count().await, 1);

        drop(rx);
        bus.prune(key).await;
        assert_eq!(bus.channel_count().await, 0);
    }

    #[tokio::test]
    async fn envelope_round_trips_as_json() {
        let event = ChannelEvent::new(
            ChannelEventKind::AlertUpdate,
            serde_json::json!({ "alert_id": 4 }),
        );

        let text = serde_json::to_string(&event).unwrap();
        let back: ChannelEvent = serde_json::from_str(&text).unwrap();

        assert_eq!(back.kind, ChannelEventKind::AlertUpdate);
        assert_eq!(back.payload["alert_id"], 4);
    }
}

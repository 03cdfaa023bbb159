//! Last-write-wins presence registry for chat clients.
//!
//! Every connected client heartbeats `(user, organization, active chat
//! peer)` on an interval it chooses. Only the latest heartbeat per client
//! is kept, and entries expire after a TTL so a crashed client cannot pin
//! "currently viewing" state forever. The store is allowed to be stale by
//! up to one heartbeat interval.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use muster_core::types::DbId;
use tokio::sync::RwLock;

use crate::bus::ChannelKey;

/// Default entry lifetime: two of the suggested 15 s heartbeat intervals.
pub const DEFAULT_PRESENCE_TTL: Duration = Duration::from_secs(30);

/// What one client last reported about its UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    /// Peer whose conversation is open on screen, if any.
    pub active_chat_with: Option<DbId>,
    /// When the heartbeat carrying this state arrived.
    pub updated_at: DateTime<Utc>,
}

/// Keyed presence storage with TTL semantics.
///
/// The in-memory implementation below serves a single process; a
/// multi-process deployment swaps in one backed by a shared keyed cache
/// with the same interface.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Record the latest heartbeat for a client. Last write wins.
    async fn set(&self, key: ChannelKey, active_chat_with: Option<DbId>);

    /// The latest un-expired entry for a client, if any.
    async fn get(&self, key: ChannelKey) -> Option<PresenceEntry>;

    /// Forget a client (its connection closed).
    async fn clear(&self, key: ChannelKey);
}

/// In-memory, process-local presence store.
///
/// Ephemeral by design: state is rebuilt from client heartbeats after a
/// restart, so nothing is persisted.
pub struct InMemoryPresenceStore {
    ttl: Duration,
    entries: RwLock<HashMap<ChannelKey, PresenceEntry>>,
}

impl InMemoryPresenceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, entry: &PresenceEntry, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => now.signed_duration_since(entry.updated_at) < ttl,
            Err(_) => true,
        }
    }

    /// Drop every expired entry; returns how many were evicted.
    ///
    /// Reads already treat expired entries as absent; this sweep only
    /// reclaims the memory behind them.
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_fresh(entry, now));
        before - entries.len()
    }

    /// Number of entries currently held, fresh or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryPresenceStore {
    fn default() -> Self {
        Self::new(DEFAULT_PRESENCE_TTL)
    }
}

#[async_trait]
impl PresenceStore for InMemoryPresenceStore {
    async fn set(&self, key: ChannelKey, active_chat_with: Option<DbId>) {
        let entry = PresenceEntry {
            active_chat_with,
            updated_at: Utc::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    async fn get(&self, key: ChannelKey) -> Option<PresenceEntry> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .filter(|entry| self.is_fresh(entry, now))
            .copied()
    }

    async fn clear(&self, key: ChannelKey) {
        self.entries.write().await.remove(&key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

use std::sync::Arc;

use muster_events::{MessageBus, PresenceStore, PushSender};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: muster_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-user pub/sub fan-out for chat and alert updates.
    pub bus: Arc<MessageBus>,
    /// Latest-heartbeat presence registry.
    pub presence: Arc<dyn PresenceStore>,
    /// Push provider used for offline chat delivery.
    pub push: Arc<dyn PushSender>,
}

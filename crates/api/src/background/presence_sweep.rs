//! Periodic eviction of expired presence entries.
//!
//! Reads already treat expired entries as absent; this loop reclaims the
//! memory behind clients that vanished without closing their stream. Runs
//! on a fixed interval until cancelled.

use std::sync::Arc;
use std::time::Duration;

use muster_events::InMemoryPresenceStore;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Run the presence sweep loop until `cancel` is triggered.
pub async fn run(store: Arc<InMemoryPresenceStore>, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = SWEEP_INTERVAL.as_secs(),
        "Presence sweep started"
    );

    let mut interval = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Presence sweep stopping");
                break;
            }
            _ = interval.tick() => {
                let evicted = store.evict_expired().await;
                if evicted > 0 {
                    tracing::debug!(evicted, "Presence sweep evicted stale entries");
                }
            }
        }
    }
}

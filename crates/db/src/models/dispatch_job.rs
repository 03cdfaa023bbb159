//! Dispatch queue job entity.

use muster_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `dispatch_jobs` table.
///
/// One job per alert-dispatch intent. Ephemeral bookkeeping: jobs record
/// queue state (attempts, backoff schedule, terminal outcome) and are never
/// a reporting source of truth.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DispatchJob {
    pub id: DbId,
    pub alert_id: DbId,
    pub send_sms: bool,
    pub attempts: i16,
    pub max_attempts: i16,
    pub not_before: Timestamp,
    pub status: String,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

//! Aggregated read models for dashboards.

use muster_core::aggregate::ResponseCounts;
use muster_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Live counters for one active alert, as pushed to dashboard streams.
#[derive(Debug, Clone, Serialize)]
pub struct AlertAggregate {
    pub alert_id: DbId,
    pub emergency_type: String,
    pub message: String,
    pub severity: String,
    pub start_time: Option<Timestamp>,
    pub total_recipients: i64,
    #[serde(flatten)]
    pub counts: ResponseCounts,
    pub not_responded: i64,
}

/// Detail view of a single alert with its aggregated recipient counts.
#[derive(Debug, Clone, Serialize)]
pub struct AlertDetail {
    pub alert_id: DbId,
    pub emergency_type: String,
    pub message: String,
    pub severity: String,
    pub status: String,
    pub start_time: Option<Timestamp>,
    pub areas: Vec<String>,
    pub counts: AlertDetailCounts,
}

/// Recipient counters in the detail view.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AlertDetailCounts {
    pub total_recipients: i64,
    pub responded: i64,
    pub safe: i64,
    pub need_help: i64,
    pub emergency_help_needed: i64,
    pub not_responded: i64,
    pub delivered: i64,
}

/// Internal row for the active-alert header query.
#[derive(Debug, FromRow)]
pub(crate) struct ActiveAlertRow {
    pub id: DbId,
    pub emergency_type: String,
    pub message: String,
    pub severity: String,
    pub start_time: Option<Timestamp>,
}

/// Internal row for the per-alert recipient totals.
#[derive(Debug, FromRow)]
pub(crate) struct AlertTotalRow {
    pub alert_id: DbId,
    pub total: i64,
}

/// Internal row for the per-alert response breakdown.
#[derive(Debug, FromRow)]
pub(crate) struct ResponseBreakdownRow {
    pub alert_id: DbId,
    pub response: String,
    pub count: i64,
}

//! Per-recipient delivery-tracking entity and DTOs.

use muster_core::response::ResponseHistory;
use muster_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `delivery_records` table: the durable audit trail of one
/// alert's delivery to one recipient.
///
/// At most one row exists per `(alert_id, user_id)`, enforced by a unique
/// constraint and relied on by the idempotent fan-out and the
/// response-before-fan-out race.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeliveryRecord {
    pub id: DbId,
    pub alert_id: DbId,
    pub user_id: DbId,
    pub delivery_status: String,
    pub delivered_at: Option<Timestamp>,
    pub acknowledged_at: Option<Timestamp>,
    pub response: Option<String>,
    pub response_updated_at: Option<Timestamp>,
    /// JSONB column; decode with [`DeliveryRecord::history`].
    pub response_history: serde_json::Value,
    pub created_at: Timestamp,
}

impl DeliveryRecord {
    /// Decode the JSONB history column into the append-only log type.
    pub fn history(&self) -> ResponseHistory {
        serde_json::from_value(self.response_history.clone()).unwrap_or_default()
    }
}

/// DTO for `POST /alerts/{id}/response`.
#[derive(Debug, Deserialize)]
pub struct RecordResponse {
    pub user_id: DbId,
    /// One of `safe`, `need_help`, `emergency_help_needed`.
    pub response: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
}

/// A validated location snapshot extracted from [`RecordResponse`].
#[derive(Debug, Clone)]
pub struct LocationSnapshot {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: Option<String>,
}

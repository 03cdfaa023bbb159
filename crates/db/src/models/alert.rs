//! Alert entity and DTOs.

use muster_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `alerts` table.
///
/// Created by the external alert-creation flow; this core only moves
/// `status` forward (scheduled → active → resolved) and never deletes rows.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Alert {
    pub id: DbId,
    pub organization_id: DbId,
    pub emergency_type_id: Option<DbId>,
    pub created_by: Option<DbId>,
    pub message: String,
    pub severity: String,
    pub status: String,
    pub start_time: Option<Timestamp>,
    pub scheduled_time: Option<Timestamp>,
    pub resolved_at: Option<Timestamp>,
    pub resolution_message: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for `POST /alerts/{id}/dispatch`.
#[derive(Debug, Deserialize)]
pub struct DispatchAlert {
    /// Whether the fan-out should also send SMS to recipients with a phone
    /// number.
    pub send_sms: bool,
}

/// DTO for `POST /alerts/{id}/resolve`.
#[derive(Debug, Deserialize)]
pub struct ResolveAlert {
    /// Free-text resolution note, kept apart from the alert's display
    /// message.
    pub message: Option<String>,
}

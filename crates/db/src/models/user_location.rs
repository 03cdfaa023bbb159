//! Point-in-time location snapshot entity.

use muster_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_locations` table.
///
/// Written once when an employee attaches a location to their response;
/// never updated afterwards. A log entry, not a mutable field.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserLocation {
    pub id: DbId,
    pub user_id: DbId,
    pub alert_id: DbId,
    pub latitude: String,
    pub longitude: String,
    pub location_name: Option<String>,
    pub created_at: Timestamp,
}

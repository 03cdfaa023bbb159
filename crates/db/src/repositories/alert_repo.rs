//! Repository for the `alerts` table.
//!
//! Status values are the text forms of `muster_core::alert::AlertStatus`;
//! every transition here carries its guard in the WHERE clause so retried
//! jobs and racing workers stay idempotent.

use muster_core::alert::AlertStatus;
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::alert::Alert;

/// Column list for `alerts` queries.
const COLUMNS: &str = "\
    id, organization_id, emergency_type_id, created_by, message, severity, \
    status, start_time, scheduled_time, resolved_at, resolution_message, \
    created_at";

/// Provides lifecycle operations for alerts.
pub struct AlertRepo;

impl AlertRepo {
    /// Find an alert by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Alert>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alerts WHERE id = $1");
        sqlx::query_as::<_, Alert>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Transition an alert to `active`, stamping `start_time`, but only if
    /// it is still `scheduled`.
    ///
    /// Safe under at-least-once job delivery: a second call finds the alert
    /// already active and leaves the earlier `start_time` untouched.
    /// Returns the current row either way; `RowNotFound` if the alert does
    /// not exist.
    pub async fn activate(
        pool: &PgPool,
        alert_id: DbId,
        start_time: Timestamp,
    ) -> Result<Alert, sqlx::Error> {
        let query = format!(
            "UPDATE alerts \
             SET status = $2, start_time = $3 \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Alert>(&query)
            .bind(alert_id)
            .bind(AlertStatus::Active.as_str())
            .bind(start_time)
            .bind(AlertStatus::Scheduled.as_str())
            .fetch_optional(pool)
            .await?;

        match updated {
            Some(alert) => Ok(alert),
            // Already active (or resolved); fetch the row as-is.
            None => Self::find_by_id(pool, alert_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Resolve an active alert, stamping `resolved_at` and storing the
    /// resolution note in its own column.
    ///
    /// Returns `false` if the alert was not in the `active` state.
    pub async fn resolve(
        pool: &PgPool,
        alert_id: DbId,
        resolution_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE alerts \
             SET status = $2, resolved_at = NOW(), resolution_message = $3 \
             WHERE id = $1 AND status = $4",
        )
        .bind(alert_id)
        .bind(AlertStatus::Resolved.as_str())
        .bind(resolution_message)
        .bind(AlertStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The area ids an alert targets.
    pub async fn area_ids(pool: &PgPool, alert_id: DbId) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT area_id FROM alert_areas WHERE alert_id = $1")
            .bind(alert_id)
            .fetch_all(pool)
            .await
    }
}

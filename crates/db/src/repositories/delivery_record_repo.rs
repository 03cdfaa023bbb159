//! Repository for the `delivery_records` table.
//!
//! Creation is always find-or-create on the `(alert_id, user_id)` unique
//! constraint (a single atomic conditional insert, never read-then-write),
//! so duplicate job deliveries and the response-arrives-before-fan-out race
//! both collapse into one row.

use chrono::Utc;
use muster_core::alert::{activation_start_time, AlertStatus};
use muster_core::response::{DeliveryStatus, EmployeeResponse, ResponseEntry, ResponseHistory};
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::delivery_record::{DeliveryRecord, LocationSnapshot};
use crate::repositories::user_location_repo::UserLocationRepo;

/// Column list for `delivery_records` queries.
const COLUMNS: &str = "\
    id, alert_id, user_id, delivery_status, delivered_at, acknowledged_at, \
    response, response_updated_at, response_history, created_at";

pub struct DeliveryRecordRepo;

impl DeliveryRecordRepo {
    /// Create one tracking record per recipient in a single idempotent bulk
    /// insert.
    ///
    /// Rows that already exist (job retry, or the recipient responded before
    /// fan-out finished) are skipped, not errors. Returns the number of rows
    /// actually inserted.
    pub async fn create_for_recipients(
        pool: &PgPool,
        alert_id: DbId,
        user_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO delivery_records (alert_id, user_id) \
             SELECT $1, user_id FROM UNNEST($2::BIGINT[]) AS r(user_id) \
             ON CONFLICT (alert_id, user_id) DO NOTHING",
        )
        .bind(alert_id)
        .bind(user_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Advance records to `sent` after a successful push hand-off.
    ///
    /// Only `pending` rows move; anything already `sent` or `delivered`
    /// (a response landed first) is left alone; delivery status never
    /// regresses.
    pub async fn mark_sent(
        pool: &PgPool,
        alert_id: DbId,
        user_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE delivery_records SET delivery_status = $3 \
             WHERE alert_id = $1 AND user_id = ANY($2) AND delivery_status = $4",
        )
        .bind(alert_id)
        .bind(user_ids)
        .bind(DeliveryStatus::Sent.as_str())
        .bind(DeliveryStatus::Pending.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Record an employee's response to an alert.
    ///
    /// Everything happens in one transaction:
    /// 1. The alert is loaded and row-locked; `RowNotFound` if absent.
    /// 2. An optional location snapshot is inserted.
    /// 3. The delivery record is upserted: created directly in the
    ///    `delivered` state if the fan-out has not reached this recipient
    ///    yet, otherwise updated in place. The new response is appended to
    ///    `response_history` (never replacing earlier entries),
    ///    `acknowledged_at` keeps its first-ever value, and
    ///    `delivery_status` is forced to `delivered`: a response is
    ///    conclusive proof of delivery.
    /// 4. If the alert was still `scheduled`, it flips to `active` with
    ///    `start_time` taken from the original schedule when one exists.
    pub async fn record_response(
        pool: &PgPool,
        alert_id: DbId,
        user_id: DbId,
        response: EmployeeResponse,
        location: Option<&LocationSnapshot>,
    ) -> Result<DeliveryRecord, sqlx::Error> {
        let now = Utc::now();

        let mut tx = pool.begin().await?;

        let alert: Option<(String, Option<Timestamp>)> =
            sqlx::query_as("SELECT status, scheduled_time FROM alerts WHERE id = $1 FOR UPDATE")
                .bind(alert_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (status, scheduled_time) = alert.ok_or(sqlx::Error::RowNotFound)?;

        if let Some(snapshot) = location {
            UserLocationRepo::insert(&mut tx, user_id, alert_id, snapshot).await?;
        }

        let record = Self::upsert_response(&mut tx, alert_id, user_id, response, now).await?;

        // A response to a scheduled alert is evidence fan-out has effectively
        // begun; nudge the alert to active. The status guard keeps this from
        // clobbering a start_time the worker already stamped.
        if status == AlertStatus::Scheduled.as_str() {
            sqlx::query("UPDATE alerts SET status = $2, start_time = $3 WHERE id = $1 AND status = $4")
                .bind(alert_id)
                .bind(AlertStatus::Active.as_str())
                .bind(activation_start_time(scheduled_time, now))
                .bind(AlertStatus::Scheduled.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(record)
    }

    /// The atomic insert-or-update at the heart of response recording.
    async fn upsert_response(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        alert_id: DbId,
        user_id: DbId,
        response: EmployeeResponse,
        now: Timestamp,
    ) -> Result<DeliveryRecord, sqlx::Error> {
        let mut entry = ResponseHistory::new();
        entry.push(ResponseEntry { response, at: now });
        let entry_json =
            serde_json::to_value(&entry).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let query = format!(
            "INSERT INTO delivery_records \
                 (alert_id, user_id, delivery_status, delivered_at, acknowledged_at, \
                  response, response_updated_at, response_history) \
             VALUES ($1, $2, $5, $3, $3, $4, $3, $6) \
             ON CONFLICT (alert_id, user_id) DO UPDATE SET \
                 response = EXCLUDED.response, \
                 response_updated_at = EXCLUDED.response_updated_at, \
                 acknowledged_at = COALESCE(delivery_records.acknowledged_at, EXCLUDED.acknowledged_at), \
                 delivered_at = COALESCE(delivery_records.delivered_at, EXCLUDED.delivered_at), \
                 delivery_status = EXCLUDED.delivery_status, \
                 response_history = delivery_records.response_history || EXCLUDED.response_history \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DeliveryRecord>(&query)
            .bind(alert_id)
            .bind(user_id)
            .bind(now)
            .bind(response.as_str())
            .bind(DeliveryStatus::Delivered.as_str())
            .bind(entry_json)
            .fetch_one(&mut **tx)
            .await
    }

    /// Find the record for one `(alert, recipient)` pair.
    pub async fn find(
        pool: &PgPool,
        alert_id: DbId,
        user_id: DbId,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM delivery_records WHERE alert_id = $1 AND user_id = $2");
        sqlx::query_as::<_, DeliveryRecord>(&query)
            .bind(alert_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// All records for an alert, oldest first.
    pub async fn list_for_alert(
        pool: &PgPool,
        alert_id: DbId,
    ) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM delivery_records WHERE alert_id = $1 ORDER BY id");
        sqlx::query_as::<_, DeliveryRecord>(&query)
            .bind(alert_id)
            .fetch_all(pool)
            .await
    }
}

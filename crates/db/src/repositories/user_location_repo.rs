//! Repository for the `user_locations` table.

use muster_core::types::DbId;
use sqlx::PgPool;

use crate::models::delivery_record::LocationSnapshot;
use crate::models::user_location::UserLocation;

/// Column list for `user_locations` queries.
const COLUMNS: &str = "id, user_id, alert_id, latitude, longitude, location_name, created_at";

pub struct UserLocationRepo;

impl UserLocationRepo {
    /// Insert one immutable snapshot inside the caller's transaction.
    ///
    /// Coordinates are stored as text to keep the provider-reported
    /// precision intact.
    pub async fn insert(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: DbId,
        alert_id: DbId,
        snapshot: &LocationSnapshot,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_locations (user_id, alert_id, latitude, longitude, location_name) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(alert_id)
        .bind(snapshot.latitude.to_string())
        .bind(snapshot.longitude.to_string())
        .bind(snapshot.location_name.as_deref())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// All snapshots recorded for an alert, oldest first.
    pub async fn list_for_alert(
        pool: &PgPool,
        alert_id: DbId,
    ) -> Result<Vec<UserLocation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_locations WHERE alert_id = $1 ORDER BY id");
        sqlx::query_as::<_, UserLocation>(&query)
            .bind(alert_id)
            .fetch_all(pool)
            .await
    }
}

//! Read-side user queries and push-token self-healing.
//!
//! User CRUD lives in an external service; this repo only resolves alert
//! recipients, looks up chat peers, and clears tokens the push provider
//! reports as dead.

use muster_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{ChatPeer, Recipient};

pub struct UserRepo;

impl UserRepo {
    /// Resolve the current recipient set for a set of target areas:
    /// every active user assigned to any of them.
    pub async fn active_recipients_in_areas(
        pool: &PgPool,
        area_ids: &[DbId],
    ) -> Result<Vec<Recipient>, sqlx::Error> {
        sqlx::query_as::<_, Recipient>(
            "SELECT id, push_token, phone_number FROM users \
             WHERE area_id = ANY($1) AND is_active \
             ORDER BY id",
        )
        .bind(area_ids)
        .fetch_all(pool)
        .await
    }

    /// Drop a user's stored push token.
    ///
    /// Called when the provider reports the token is no longer registered,
    /// so we stop burning sends on a dead device.
    pub async fn clear_push_token(pool: &PgPool, user_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET push_token = NULL WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Look up a chat participant for push fallback and display.
    pub async fn chat_peer(pool: &PgPool, user_id: DbId) -> Result<Option<ChatPeer>, sqlx::Error> {
        sqlx::query_as::<_, ChatPeer>(
            "SELECT id, first_name, last_name, push_token, e2ee_public_key \
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }
}

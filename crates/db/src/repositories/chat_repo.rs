//! Repository for the `chat_messages` table.
//!
//! Status transitions carry their monotonic guard in SQL: a message can
//! only move forward through sent → delivered → read, no matter what order
//! receipts arrive in.

use chrono::Utc;
use muster_core::chat::ChatMessageStatus;
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::chat_message::{ChatContact, ChatMessage, SendChatMessage};

/// Column list for `chat_messages` queries.
const COLUMNS: &str = "\
    id, organization_id, sender_id, receiver_id, encrypted_message, \
    encrypted_sym_key, status, sent_at, read_at, deleted_by_sender, \
    deleted_by_receiver";

/// SQL expression ranking a status text for the monotonic guard.
/// Mirrors `ChatMessageStatus::rank`.
const RANK_EXPR: &str = "CASE {col} WHEN 'sent' THEN 0 WHEN 'delivered' THEN 1 ELSE 2 END";

fn rank_sql(column: &str) -> String {
    RANK_EXPR.replace("{col}", column)
}

pub struct ChatRepo;

impl ChatRepo {
    /// Persist a new message in the `sent` state.
    pub async fn create(
        pool: &PgPool,
        input: &SendChatMessage,
    ) -> Result<ChatMessage, sqlx::Error> {
        let query = format!(
            "INSERT INTO chat_messages \
                 (organization_id, sender_id, receiver_id, encrypted_message, \
                  encrypted_sym_key, status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(input.organization_id)
            .bind(input.sender_id)
            .bind(input.receiver_id)
            .bind(&input.encrypted_message)
            .bind(&input.encrypted_sym_key)
            .bind(ChatMessageStatus::Sent.as_str())
            .fetch_one(pool)
            .await
    }

    /// Upgrade a freshly sent message to `delivered`.
    ///
    /// Returns `None` when the message has already progressed past `sent`
    /// because another receipt raced us. A no-op, not an error.
    pub async fn mark_delivered(
        pool: &PgPool,
        message_id: DbId,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query = format!(
            "UPDATE chat_messages SET status = $2 \
             WHERE id = $1 AND status = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(message_id)
            .bind(ChatMessageStatus::Delivered.as_str())
            .bind(ChatMessageStatus::Sent.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Move a message to `status`, forward only.
    ///
    /// `read` stamps `read_at`. Backward or same-state requests return
    /// `None` and change nothing.
    pub async fn update_status(
        pool: &PgPool,
        message_id: DbId,
        organization_id: DbId,
        status: ChatMessageStatus,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let read_at: Option<Timestamp> = match status {
            ChatMessageStatus::Read => Some(Utc::now()),
            _ => None,
        };

        let query = format!(
            "UPDATE chat_messages \
             SET status = $3, read_at = COALESCE($4, read_at) \
             WHERE id = $1 AND organization_id = $2 AND {current_rank} < $5 \
             RETURNING {COLUMNS}",
            current_rank = rank_sql("status"),
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(message_id)
            .bind(organization_id)
            .bind(status.as_str())
            .bind(read_at)
            .bind(status.rank())
            .fetch_optional(pool)
            .await
    }

    /// Find a message by its ID within an organization.
    pub async fn find_by_id(
        pool: &PgPool,
        message_id: DbId,
        organization_id: DbId,
    ) -> Result<Option<ChatMessage>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM chat_messages WHERE id = $1 AND organization_id = $2");
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(message_id)
            .bind(organization_id)
            .fetch_optional(pool)
            .await
    }

    /// A user's message history, oldest first, hiding messages that user
    /// soft-deleted. The other participant's copy is unaffected.
    pub async fn list_for_user(
        pool: &PgPool,
        organization_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<ChatMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chat_messages \
             WHERE organization_id = $1 \
               AND ((sender_id = $2 AND NOT deleted_by_sender) \
                 OR (receiver_id = $2 AND NOT deleted_by_receiver)) \
             ORDER BY sent_at ASC, id ASC"
        );
        sqlx::query_as::<_, ChatMessage>(&query)
            .bind(organization_id)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Every peer the user has exchanged messages with, newest conversation
    /// first, each with the latest message as a preview (still ciphertext).
    pub async fn contacts(
        pool: &PgPool,
        organization_id: DbId,
        user_id: DbId,
    ) -> Result<Vec<ChatContact>, sqlx::Error> {
        sqlx::query_as::<_, ChatContact>(
            "SELECT c.peer_id, u.first_name, u.last_name, \
                    c.last_message_encrypted, c.last_sent_at \
             FROM ( \
                 SELECT DISTINCT ON (peer_id) \
                        CASE WHEN sender_id = $2 THEN receiver_id ELSE sender_id END AS peer_id, \
                        encrypted_message AS last_message_encrypted, \
                        sent_at AS last_sent_at \
                 FROM chat_messages \
                 WHERE organization_id = $1 AND (sender_id = $2 OR receiver_id = $2) \
                 ORDER BY peer_id, sent_at DESC, id DESC \
             ) c \
             JOIN users u ON u.id = c.peer_id \
             ORDER BY c.last_sent_at DESC",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Soft-delete a message for one participant.
    ///
    /// Only the flag belonging to `user_id`'s side flips; the row itself is
    /// never removed. Returns `false` if the message does not exist or the
    /// user is not a participant.
    pub async fn soft_delete_for(
        pool: &PgPool,
        message_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE chat_messages \
             SET deleted_by_sender = deleted_by_sender OR sender_id = $2, \
                 deleted_by_receiver = deleted_by_receiver OR receiver_id = $2 \
             WHERE id = $1 AND (sender_id = $2 OR receiver_id = $2)",
        )
        .bind(message_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

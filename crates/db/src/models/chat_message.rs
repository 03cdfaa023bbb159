//! Chat message entity and DTOs.

use muster_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `chat_messages` table.
///
/// End-to-end encrypted: `encrypted_message` is ciphertext and
/// `encrypted_sym_key` is the wrapped symmetric key. The server never holds
/// plaintext. Each side can soft-delete independently; rows are never hard
/// deleted while either side retains them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatMessage {
    pub id: DbId,
    pub organization_id: DbId,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub encrypted_message: String,
    pub encrypted_sym_key: String,
    pub status: String,
    pub sent_at: Timestamp,
    pub read_at: Option<Timestamp>,
    pub deleted_by_sender: bool,
    pub deleted_by_receiver: bool,
}

/// DTO for `POST /chat/messages`.
#[derive(Debug, Deserialize)]
pub struct SendChatMessage {
    pub organization_id: DbId,
    pub sender_id: DbId,
    pub receiver_id: DbId,
    pub encrypted_message: String,
    pub encrypted_sym_key: String,
}

/// DTO for `POST /chat/messages/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateChatStatus {
    pub organization_id: DbId,
    /// Target status: `delivered` or `read`.
    pub status: String,
}

/// DTO for `POST /chat/messages/{id}/delete`.
#[derive(Debug, Deserialize)]
pub struct DeleteChatMessage {
    /// The participant requesting the delete; only their copy disappears.
    pub user_id: DbId,
}

/// One entry in the contact list: a peer plus the latest message exchanged
/// with them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatContact {
    pub peer_id: DbId,
    pub first_name: String,
    pub last_name: String,
    pub last_message_encrypted: String,
    pub last_sent_at: Timestamp,
}

//! Handlers for the `/chat` resource.
//!
//! The server only ever touches ciphertext: messages arrive encrypted with
//! a wrapped symmetric key, and the push-notification fallback forwards the
//! ciphertext untouched.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use muster_core::chat::ChatMessageStatus;
use muster_core::error::CoreError;
use muster_core::types::DbId;
use muster_db::models::chat_message::{
    ChatMessage, DeleteChatMessage, SendChatMessage, UpdateChatStatus,
};
use muster_db::repositories::{ChatRepo, UserRepo};
use muster_events::{
    ChannelEvent, ChannelEventKind, ChannelKey, PresenceStore, PushMessage, PushOutcome,
    PushSender,
};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /chat/messages` and `GET /chat/contacts`.
#[derive(Debug, serde::Deserialize)]
pub struct ChatQuery {
    pub organization_id: DbId,
    pub user_id: DbId,
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// POST /api/v1/chat/messages
///
/// Persist the message, decide delivered-vs-sent from the receiver's latest
/// presence, publish to the receiver's channel, and fall back to a push
/// notification (ciphertext only) when no live connection is subscribed.
pub async fn send_message(
    State(state): State<AppState>,
    Json(input): Json<SendChatMessage>,
) -> AppResult<impl IntoResponse> {
    if input.encrypted_message.is_empty() || input.encrypted_sym_key.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "encrypted_message and encrypted_sym_key are required".to_string(),
        )));
    }

    let mut message = ChatRepo::create(&state.pool, &input).await?;

    let receiver_key = ChannelKey::new(input.organization_id, input.receiver_id);

    // Presence-aware upgrade, decided at publish time: if the receiver's
    // latest heartbeat shows this conversation open, the message is
    // delivered the moment we hand it onward.
    let viewing_sender = state
        .presence
        .get(receiver_key)
        .await
        .is_some_and(|entry| entry.active_chat_with == Some(input.sender_id));

    if viewing_sender && input.sender_id != input.receiver_id {
        if let Some(upgraded) = ChatRepo::mark_delivered(&state.pool, message.id).await? {
            message = upgraded;
        }
    }

    let payload = serde_json::to_value(&message)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize message: {e}")))?;
    let subscribers = state
        .bus
        .publish(
            receiver_key,
            ChannelEvent::new(ChannelEventKind::ChatMessage, payload),
        )
        .await;

    if subscribers == 0 && input.sender_id != input.receiver_id {
        push_fallback(&state, &message).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "data": message })),
    ))
}

/// Push the ciphertext to the receiver's device when no live connection is
/// subscribed to their channel. Best-effort: failures are logged and dead
/// tokens are cleared, nothing propagates to the sender's request.
async fn push_fallback(state: &AppState, message: &ChatMessage) {
    let sender = match UserRepo::chat_peer(&state.pool, message.sender_id).await {
        Ok(Some(sender)) => sender,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load sender for push fallback");
            return;
        }
    };

    let receiver = match UserRepo::chat_peer(&state.pool, message.receiver_id).await {
        Ok(Some(receiver)) => receiver,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load receiver for push fallback");
            return;
        }
    };

    let Some(token) = receiver.push_token else {
        tracing::debug!(user_id = message.receiver_id, "No push token, message waits in inbox");
        return;
    };

    let push = PushMessage {
        user_id: message.receiver_id,
        token,
        title: format!("{} {}", sender.first_name, sender.last_name),
        // Ciphertext only; the provider never sees message content.
        body: message.encrypted_message.clone(),
        data: serde_json::json!({
            "organization_id": message.organization_id,
            "sender_id": message.sender_id,
            "chat_partner_id": message.sender_id,
            "message_id": message.id,
            "peer_public_key": sender.e2ee_public_key.unwrap_or_default(),
        }),
    };

    for result in state.push.send_batch(&[push]).await {
        match result.outcome {
            PushOutcome::Delivered => {}
            PushOutcome::Unregistered => {
                tracing::info!(
                    user_id = result.user_id,
                    "Push token no longer registered, clearing it"
                );
                if let Err(e) = UserRepo::clear_push_token(&state.pool, result.user_id).await {
                    tracing::warn!(user_id = result.user_id, error = %e, "Failed to clear dead push token");
                }
            }
            PushOutcome::Failed(reason) => {
                tracing::warn!(user_id = result.user_id, reason, "Chat push fallback failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// GET /api/v1/chat/messages?organization_id=…&user_id=…
///
/// The user's message history, oldest first, hiding messages they
/// soft-deleted.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(params): Query<ChatQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let messages =
        ChatRepo::list_for_user(&state.pool, params.organization_id, params.user_id).await?;

    Ok(Json(serde_json::json!({ "data": messages })))
}

/// GET /api/v1/chat/contacts?organization_id=…&user_id=…
///
/// Every peer the user has a conversation with, newest first, each with the
/// latest (still encrypted) message as a preview.
pub async fn contacts(
    State(state): State<AppState>,
    Query(params): Query<ChatQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let contacts = ChatRepo::contacts(&state.pool, params.organization_id, params.user_id).await?;

    Ok(Json(serde_json::json!({ "data": contacts })))
}

// ---------------------------------------------------------------------------
// Status updates and deletion
// ---------------------------------------------------------------------------

/// POST /api/v1/chat/messages/{id}/status
///
/// Move a message forward through sent → delivered → read. Backward or
/// repeated requests are no-ops that return the current state. The sender
/// is notified of real changes on their channel.
pub async fn update_status(
    State(state): State<AppState>,
    Path(message_id): Path<DbId>,
    Json(input): Json<UpdateChatStatus>,
) -> AppResult<Json<serde_json::Value>> {
    let status = ChatMessageStatus::parse(&input.status)?;

    let updated =
        ChatRepo::update_status(&state.pool, message_id, input.organization_id, status).await?;

    let message = match updated {
        Some(message) => {
            // Tell the original sender their message progressed.
            if let Ok(payload) = serde_json::to_value(&message) {
                let sender_key = ChannelKey::new(message.organization_id, message.sender_id);
                state
                    .bus
                    .publish(
                        sender_key,
                        ChannelEvent::new(ChannelEventKind::ChatStatus, payload),
                    )
                    .await;
            }
            message
        }
        // Guard declined the transition; report the untouched row.
        None => ChatRepo::find_by_id(&state.pool, message_id, input.organization_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Message",
                id: message_id,
            })?,
    };

    Ok(Json(serde_json::json!({ "data": message })))
}

/// POST /api/v1/chat/messages/{id}/delete
///
/// Soft-delete the caller's copy of a message. The other participant keeps
/// theirs; the row is never hard-deleted.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<DbId>,
    Json(input): Json<DeleteChatMessage>,
) -> AppResult<impl IntoResponse> {
    let deleted = ChatRepo::soft_delete_for(&state.pool, message_id, input.user_id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Message",
            id: message_id,
        }));
    }

    Ok(StatusCode::NO_CONTENT)
}

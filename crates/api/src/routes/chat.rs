//! Route definitions for the `/chat` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::chat;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/chat`.
///
/// ```text
/// POST   /messages               -> send_message
/// GET    /messages               -> list_messages
/// POST   /messages/{id}/status   -> update_status
/// POST   /messages/{id}/delete   -> delete_message (per-side soft delete)
/// GET    /contacts               -> contacts
/// GET    /stream                 -> chat_stream_handler (WebSocket, duplex)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(chat::send_message).get(chat::list_messages))
        .route("/messages/{id}/status", post(chat::update_status))
        .route("/messages/{id}/delete", post(chat::delete_message))
        .route("/contacts", get(chat::contacts))
        .route("/stream", get(ws::chat_stream_handler))
}

//! Duplex chat stream: heartbeats in, channel events out.
//!
//! Protocol: the client sends JSON frames
//! `{"heartbeat": {"user_id": …, "organization_id": …, "active_chat_with": …}}`
//! on an interval of its choosing (15 s suggested). The first heartbeat
//! binds the connection to the user's bus channel; every heartbeat
//! refreshes the presence registry (last write wins). Server frames are
//! serialized [`ChannelEvent`]s. Disconnecting clears presence and drops
//! the subscription.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use muster_core::types::DbId;
use muster_events::{ChannelEvent, ChannelKey, PresenceStore};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use crate::state::AppState;

/// A frame sent by the client.
#[derive(Debug, Deserialize)]
struct ClientFrame {
    heartbeat: Option<Heartbeat>,
}

/// The client's periodic presence declaration.
#[derive(Debug, Deserialize)]
struct Heartbeat {
    user_id: DbId,
    organization_id: DbId,
    /// Peer whose conversation is open on screen, absent when none is.
    active_chat_with: Option<DbId>,
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single chat stream after upgrade.
///
/// Splits the socket into sink and stream, then:
///   1. Spawns a sender task forwarding an mpsc channel to the sink.
///   2. On the first heartbeat, subscribes to the user's bus channel and
///      spawns a relay task feeding envelopes into the sender.
///   3. Refreshes presence on every heartbeat.
///   4. Cleans up presence and the subscription on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Chat stream connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward outbound messages to the WebSocket sink.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "Chat stream sink closed");
                break;
            }
        }
    });

    let mut key: Option<ChannelKey> = None;
    let mut relay_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let frame: ClientFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed frame");
                        continue;
                    }
                };
                let Some(heartbeat) = frame.heartbeat else {
                    continue;
                };

                let heartbeat_key =
                    ChannelKey::new(heartbeat.organization_id, heartbeat.user_id);

                // First heartbeat: bind this connection to the user's
                // channel. All subsequent messages addressed to the user
                // arrive through this subscription.
                if key.is_none() {
                    key = Some(heartbeat_key);
                    let bus_rx = state.bus.subscribe(heartbeat_key).await;
                    relay_task = Some(spawn_relay(bus_rx, tx.clone(), conn_id.clone()));
                    tracing::info!(
                        conn_id = %conn_id,
                        user_id = heartbeat.user_id,
                        organization_id = heartbeat.organization_id,
                        "Chat stream subscribed"
                    );
                }

                // Every heartbeat refreshes presence; the latest one wins.
                state
                    .presence
                    .set(heartbeat_key, heartbeat.active_chat_with)
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "Chat stream receive error");
                break;
            }
        }
    }

    // Connection gone: its presence claim and subscription go with it.
    if let Some(key) = key {
        state.presence.clear(key).await;
    }
    if let Some(task) = relay_task {
        task.abort();
    }
    send_task.abort();
    if let Some(key) = key {
        state.bus.prune(key).await;
    }
    tracing::info!(conn_id = %conn_id, "Chat stream disconnected");
}

/// Relay bus envelopes to the connection's sender channel.
fn spawn_relay(
    mut bus_rx: broadcast::Receiver<ChannelEvent>,
    tx: mpsc::UnboundedSender<Message>,
    conn_id: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match bus_rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(text) => {
                        if tx.send(Message::Text(text.into())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(conn_id = %conn_id, error = %e, "Failed to serialize envelope");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(conn_id = %conn_id, skipped, "Chat stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_frame_parses() {
        let frame: ClientFrame = serde_json::from_str(
            r#"{"heartbeat": {"user_id": 7, "organization_id": 3, "active_chat_with": 9}}"#,
        )
        .unwrap();

        let heartbeat = frame.heartbeat.unwrap();
        assert_eq!(heartbeat.user_id, 7);
        assert_eq!(heartbeat.organization_id, 3);
        assert_eq!(heartbeat.active_chat_with, Some(9));
    }

    #[test]
    fn heartbeat_without_active_chat_parses_as_none() {
        let frame: ClientFrame =
            serde_json::from_str(r#"{"heartbeat": {"user_id": 7, "organization_id": 3}}"#).unwrap();

        assert_eq!(frame.heartbeat.unwrap().active_chat_with, None);
    }

    #[test]
    fn non_heartbeat_frame_is_tolerated() {
        let frame: ClientFrame = serde_json::from_str(r#"{"something_else": true}"#).unwrap();

        assert!(frame.heartbeat.is_none());
    }
}

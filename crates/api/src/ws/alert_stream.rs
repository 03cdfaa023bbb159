//! Server-streaming live alert aggregates for dashboards.
//!
//! Pushes the organization's active-alert snapshot immediately on connect
//! and then on a fixed interval for as long as the client stays connected.
//! The recomputation loop lives inside the connection task, so it is torn
//! down the instant the socket closes; no polling survives a disconnect.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use muster_core::types::DbId;
use muster_db::repositories::AggregateRepo;
use serde::Deserialize;

use crate::state::AppState;

/// Query parameters for `GET /alerts/stream`.
#[derive(Debug, Deserialize)]
pub struct AlertStreamQuery {
    pub organization_id: DbId,
}

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn alert_stream_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<AlertStreamQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_aggregates(socket, state, params.organization_id))
}

/// Recompute-and-push loop for one dashboard connection.
async fn stream_aggregates(mut socket: WebSocket, state: AppState, organization_id: DbId) {
    tracing::info!(organization_id, "Alert aggregate stream connected");

    let mut ticker = tokio::time::interval(Duration::from_secs(
        state.config.aggregate_push_interval_secs,
    ));

    loop {
        tokio::select! {
            // Any close (or transport error) ends the loop, and the ticker
            // dies with it.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(organization_id, error = %e, "Alert stream receive error");
                        break;
                    }
                }
            }
            // First tick fires immediately: clients get a snapshot on
            // connect, then one per interval.
            _ = ticker.tick() => {
                match AggregateRepo::active_for_org(&state.pool, organization_id).await {
                    Ok(aggregates) => {
                        let payload = serde_json::json!({ "active_alerts": aggregates });
                        if socket
                            .send(Message::Text(payload.to_string().into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        // Skip this tick; the next recomputation may succeed.
                        tracing::error!(
                            organization_id,
                            error = %e,
                            "Failed to recompute alert aggregates"
                        );
                    }
                }
            }
        }
    }

    tracing::info!(organization_id, "Alert aggregate stream closed");
}

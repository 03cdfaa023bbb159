//! Route definitions for the `/alerts` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/alerts`.
///
/// ```text
/// GET    /active          -> active_alerts (one-shot aggregates)
/// GET    /stream          -> alert_stream_handler (WebSocket, pushed aggregates)
/// GET    /{id}            -> get_alert (detail with counts)
/// POST   /{id}/dispatch   -> dispatch_alert (enqueue fan-out)
/// POST   /{id}/response   -> record_response
/// POST   /{id}/resolve    -> resolve_alert
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/active", get(alerts::active_alerts))
        .route("/stream", get(ws::alert_stream_handler))
        .route("/{id}", get(alerts::get_alert))
        .route("/{id}/dispatch", post(alerts::dispatch_alert))
        .route("/{id}/response", post(alerts::record_response))
        .route("/{id}/resolve", post(alerts::resolve_alert))
}

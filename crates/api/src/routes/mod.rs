//! Route tree assembly.

pub mod alerts;
pub mod chat;
pub mod dispatch;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/alerts", alerts::router())
        .nest("/chat", chat::router())
        .nest("/dispatch", dispatch::router())
}

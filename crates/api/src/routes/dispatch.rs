//! Route definitions for dispatch-queue operations.

use axum::routing::get;
use axum::Router;

use crate::handlers::dispatch;
use crate::state::AppState;

/// Routes mounted at `/dispatch`.
///
/// ```text
/// GET    /dead-letter   -> dead_letter (exhausted jobs)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/dead-letter", get(dispatch::dead_letter))
}

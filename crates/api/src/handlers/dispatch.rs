//! Handlers for dispatch-queue operations.

use axum::extract::{Query, State};
use axum::Json;
use muster_db::repositories::DispatchJobRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Query parameters for `GET /dispatch/dead-letter`.
#[derive(Debug, Deserialize)]
pub struct DeadLetterQuery {
    /// Maximum number of results. Defaults to 50.
    pub limit: Option<i64>,
}

/// GET /api/v1/dispatch/dead-letter
///
/// Jobs that exhausted their retry budget, newest failures first. This is
/// the operational surface that keeps failed fan-outs from disappearing
/// silently.
pub async fn dead_letter(
    State(state): State<AppState>,
    Query(params): Query<DeadLetterQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let jobs = DispatchJobRepo::list_exhausted(&state.pool, params.limit).await?;

    Ok(Json(serde_json::json!({ "data": jobs })))
}

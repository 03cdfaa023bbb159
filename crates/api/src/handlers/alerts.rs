//! Handlers for the `/alerts` resource: dispatch intents, employee
//! responses, detail views with live counts, and resolution.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use muster_core::alert::AlertStatus;
use muster_core::dispatch::dispatch_not_before;
use muster_core::error::CoreError;
use muster_core::response::EmployeeResponse;
use muster_core::types::DbId;
use muster_db::models::alert::{DispatchAlert, ResolveAlert};
use muster_db::models::delivery_record::{LocationSnapshot, RecordResponse};
use muster_db::repositories::{AggregateRepo, AlertRepo, DeliveryRecordRepo, DispatchJobRepo};
use muster_events::{ChannelEvent, ChannelEventKind, ChannelKey};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /alerts/active`.
#[derive(Debug, Deserialize)]
pub struct ActiveAlertsQuery {
    pub organization_id: DbId,
}

// ---------------------------------------------------------------------------
// Dispatch intent
// ---------------------------------------------------------------------------

/// POST /api/v1/alerts/{id}/dispatch
///
/// Enqueue the fan-out for an alert. "Send now" alerts become consumable
/// immediately; scheduled alerts are delayed until their scheduled time.
/// The queue guarantees at-least-once processing with bounded retries.
pub async fn dispatch_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    Json(input): Json<DispatchAlert>,
) -> AppResult<Json<serde_json::Value>> {
    let alert = AlertRepo::find_by_id(&state.pool, alert_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        })?;

    if alert.status == AlertStatus::Resolved.as_str() {
        return Err(AppError::Core(CoreError::Conflict(
            "Alert is already resolved".to_string(),
        )));
    }

    let not_before = dispatch_not_before(alert.scheduled_time, Utc::now());
    let job = DispatchJobRepo::enqueue(&state.pool, alert_id, input.send_sms, not_before).await?;

    tracing::info!(
        alert_id,
        job_id = job.id,
        not_before = %job.not_before,
        "Dispatch job enqueued"
    );

    Ok(Json(serde_json::json!({
        "data": {
            "job_id": job.id,
            "alert_id": job.alert_id,
            "not_before": job.not_before,
            "status": job.status,
        }
    })))
}

// ---------------------------------------------------------------------------
// Response recording
// ---------------------------------------------------------------------------

/// POST /api/v1/alerts/{id}/response
///
/// Record an employee's response. Idempotent upsert: the delivery record is
/// created on the fly if fan-out has not reached this recipient yet, every
/// response is appended to the history, and the whole mutation (record +
/// optional location snapshot + possible alert activation) is one
/// transaction.
pub async fn record_response(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    Json(input): Json<RecordResponse>,
) -> AppResult<Json<serde_json::Value>> {
    let response = EmployeeResponse::parse(&input.response)?;

    let location = match (input.latitude, input.longitude) {
        (Some(latitude), Some(longitude)) => Some(LocationSnapshot {
            latitude,
            longitude,
            location_name: input.location_name.clone(),
        }),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "latitude and longitude must be provided together".to_string(),
            ))
        }
    };

    let record = DeliveryRecordRepo::record_response(
        &state.pool,
        alert_id,
        input.user_id,
        response,
        location.as_ref(),
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => AppError::Core(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        }),
        other => other.into(),
    })?;

    // Let the employee's other devices see the new state right away.
    // Dashboards pick it up on their next aggregate pull.
    if let Ok(Some(alert)) = AlertRepo::find_by_id(&state.pool, alert_id).await {
        if let Ok(payload) = serde_json::to_value(&record) {
            let key = ChannelKey::new(alert.organization_id, record.user_id);
            state
                .bus
                .publish(key, ChannelEvent::new(ChannelEventKind::AlertUpdate, payload))
                .await;
        }
    }

    Ok(Json(serde_json::json!({ "data": record })))
}

// ---------------------------------------------------------------------------
// Read paths
// ---------------------------------------------------------------------------

/// GET /api/v1/alerts/{id}
///
/// Alert detail with aggregated recipient counts.
pub async fn get_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
) -> AppResult<Json<serde_json::Value>> {
    let detail = AggregateRepo::alert_detail(&state.pool, alert_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Alert",
            id: alert_id,
        })?;

    Ok(Json(serde_json::json!({ "data": detail })))
}

/// GET /api/v1/alerts/active?organization_id=…
///
/// One-shot pull of the live aggregates the streaming endpoint pushes.
pub async fn active_alerts(
    State(state): State<AppState>,
    Query(params): Query<ActiveAlertsQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let aggregates = AggregateRepo::active_for_org(&state.pool, params.organization_id).await?;

    Ok(Json(serde_json::json!({ "data": { "active_alerts": aggregates } })))
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// POST /api/v1/alerts/{id}/resolve
///
/// Close out an active alert. The resolution note is stored in its own
/// column; the alert's display message is never rewritten.
pub async fn resolve_alert(
    State(state): State<AppState>,
    Path(alert_id): Path<DbId>,
    Json(input): Json<ResolveAlert>,
) -> AppResult<Json<serde_json::Value>> {
    let resolved = AlertRepo::resolve(&state.pool, alert_id, input.message.as_deref()).await?;

    if !resolved {
        return match AlertRepo::find_by_id(&state.pool, alert_id).await? {
            None => Err(AppError::Core(CoreError::NotFound {
                entity: "Alert",
                id: alert_id,
            })),
            Some(alert) => Err(AppError::Core(CoreError::Conflict(format!(
                "Alert is {}, only active alerts can be resolved",
                alert.status
            )))),
        };
    }

    tracing::info!(alert_id, "Alert resolved");

    Ok(Json(serde_json::json!({
        "data": { "alert_id": alert_id, "status": "resolved" }
    })))
}

//! Aggregation queries behind the live dashboard read paths.
//!
//! Counts are recomputed from `delivery_records` on every call. This layer
//! is pull-driven, with the streaming surface deciding how often to pull.

use std::collections::HashMap;

use muster_core::aggregate::ResponseCounts;
use muster_core::alert::AlertStatus;
use muster_core::response::{DeliveryStatus, EmployeeResponse};
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::aggregate::{
    ActiveAlertRow, AlertAggregate, AlertDetail, AlertDetailCounts, AlertTotalRow,
    ResponseBreakdownRow,
};

pub struct AggregateRepo;

impl AggregateRepo {
    /// Live counters for every active alert in an organization, newest
    /// first.
    ///
    /// Three queries: the active alerts, recipient totals per alert, and
    /// the response breakdown per alert. The not-responded figure is derived
    /// and clamped at zero to tolerate transient double-counting from
    /// concurrent response writes.
    pub async fn active_for_org(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<AlertAggregate>, sqlx::Error> {
        let alerts = sqlx::query_as::<_, ActiveAlertRow>(
            "SELECT a.id, COALESCE(et.name, '') AS emergency_type, a.message, \
                    a.severity, a.start_time \
             FROM alerts a \
             LEFT JOIN emergency_types et ON et.id = a.emergency_type_id \
             WHERE a.organization_id = $1 AND a.status = $2 \
             ORDER BY a.created_at DESC",
        )
        .bind(organization_id)
        .bind(AlertStatus::Active.as_str())
        .fetch_all(pool)
        .await?;

        if alerts.is_empty() {
            return Ok(Vec::new());
        }

        let alert_ids: Vec<DbId> = alerts.iter().map(|a| a.id).collect();

        let totals = sqlx::query_as::<_, AlertTotalRow>(
            "SELECT alert_id, COUNT(*) AS total \
             FROM delivery_records \
             WHERE alert_id = ANY($1) \
             GROUP BY alert_id",
        )
        .bind(&alert_ids)
        .fetch_all(pool)
        .await?;
        let total_by_alert: HashMap<DbId, i64> =
            totals.into_iter().map(|t| (t.alert_id, t.total)).collect();

        let breakdown = sqlx::query_as::<_, ResponseBreakdownRow>(
            "SELECT alert_id, response, COUNT(*) AS count \
             FROM delivery_records \
             WHERE alert_id = ANY($1) AND response IS NOT NULL \
             GROUP BY alert_id, response",
        )
        .bind(&alert_ids)
        .fetch_all(pool)
        .await?;

        let mut counts_by_alert: HashMap<DbId, ResponseCounts> = HashMap::new();
        for row in breakdown {
            // Rows are constrained to the known vocabulary; anything else
            // would mean schema drift, so it is skipped rather than
            // crashing the dashboard.
            match EmployeeResponse::parse(&row.response) {
                Ok(response) => counts_by_alert
                    .entry(row.alert_id)
                    .or_default()
                    .add(response, row.count),
                Err(_) => {
                    tracing::warn!(
                        alert_id = row.alert_id,
                        response = %row.response,
                        "Skipping unknown response value in aggregation"
                    );
                }
            }
        }

        Ok(alerts
            .into_iter()
            .map(|alert| {
                let total = total_by_alert.get(&alert.id).copied().unwrap_or(0);
                let counts = counts_by_alert.get(&alert.id).copied().unwrap_or_default();
                AlertAggregate {
                    alert_id: alert.id,
                    emergency_type: alert.emergency_type,
                    message: alert.message,
                    severity: alert.severity,
                    start_time: alert.start_time,
                    total_recipients: total,
                    not_responded: counts.not_responded(total),
                    counts,
                }
            })
            .collect())
    }

    /// Detail view for one alert: metadata, targeted areas, and recipient
    /// counters. Returns `None` if the alert does not exist.
    pub async fn alert_detail(
        pool: &PgPool,
        alert_id: DbId,
    ) -> Result<Option<AlertDetail>, sqlx::Error> {
        let header: Option<(DbId, String, String, String, String, Option<Timestamp>)> =
            sqlx::query_as(
                "SELECT a.id, COALESCE(et.name, '') AS emergency_type, a.message, \
                        a.severity, a.status, a.start_time \
                 FROM alerts a \
                 LEFT JOIN emergency_types et ON et.id = a.emergency_type_id \
                 WHERE a.id = $1",
            )
            .bind(alert_id)
            .fetch_optional(pool)
            .await?;

        let Some((id, emergency_type, message, severity, status, start_time)) = header else {
            return Ok(None);
        };

        let areas: Vec<String> = sqlx::query_scalar(
            "SELECT ar.name FROM alert_areas aa \
             JOIN areas ar ON ar.id = aa.area_id \
             WHERE aa.alert_id = $1 \
             ORDER BY ar.name",
        )
        .bind(alert_id)
        .fetch_all(pool)
        .await?;

        let (total, delivered): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE delivery_status = $2) \
             FROM delivery_records WHERE alert_id = $1",
        )
        .bind(alert_id)
        .bind(DeliveryStatus::Delivered.as_str())
        .fetch_one(pool)
        .await?;

        let breakdown = sqlx::query_as::<_, ResponseBreakdownRow>(
            "SELECT alert_id, response, COUNT(*) AS count \
             FROM delivery_records \
             WHERE alert_id = $1 AND response IS NOT NULL \
             GROUP BY alert_id, response",
        )
        .bind(alert_id)
        .fetch_all(pool)
        .await?;

        let mut counts = ResponseCounts::default();
        for row in breakdown {
            if let Ok(response) = EmployeeResponse::parse(&row.response) {
                counts.add(response, row.count);
            }
        }

        Ok(Some(AlertDetail {
            alert_id: id,
            emergency_type,
            message,
            severity,
            status,
            start_time,
            areas,
            counts: AlertDetailCounts {
                total_recipients: total,
                responded: counts.responded(),
                safe: counts.safe,
                need_help: counts.need_help,
                emergency_help_needed: counts.emergency_help_needed,
                not_responded: counts.not_responded(total),
                delivered,
            },
        }))
    }
}

//! Shared seed helpers for repository tests.
//!
//! Organization/area/user rows belong to external collaborators in
//! production; tests insert them directly.

#![allow(dead_code)]

use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

pub async fn seed_org(pool: &PgPool, name: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO organizations (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("seed organization")
}

pub async fn seed_area(pool: &PgPool, organization_id: DbId, name: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO areas (organization_id, name) VALUES ($1, $2) RETURNING id",
    )
    .bind(organization_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("seed area")
}

pub async fn seed_user(
    pool: &PgPool,
    organization_id: DbId,
    area_id: Option<DbId>,
    first_name: &str,
    push_token: Option<&str>,
    phone_number: Option<&str>,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users \
             (organization_id, area_id, first_name, last_name, push_token, phone_number) \
         VALUES ($1, $2, $3, 'Tester', $4, $5) \
         RETURNING id",
    )
    .bind(organization_id)
    .bind(area_id)
    .bind(first_name)
    .bind(push_token)
    .bind(phone_number)
    .fetch_one(pool)
    .await
    .expect("seed user")
}

pub async fn seed_alert(
    pool: &PgPool,
    organization_id: DbId,
    status: &str,
    scheduled_time: Option<Timestamp>,
    start_time: Option<Timestamp>,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO alerts \
             (organization_id, message, severity, status, scheduled_time, start_time) \
         VALUES ($1, 'Evacuate the building immediately', 'critical', $2, $3, $4) \
         RETURNING id",
    )
    .bind(organization_id)
    .bind(status)
    .bind(scheduled_time)
    .bind(start_time)
    .fetch_one(pool)
    .await
    .expect("seed alert")
}

pub async fn link_alert_area(pool: &PgPool, alert_id: DbId, area_id: DbId) {
    sqlx::query("INSERT INTO alert_areas (alert_id, area_id) VALUES ($1, $2)")
        .bind(alert_id)
        .bind(area_id)
        .execute(pool)
        .await
        .expect("link alert area");
}

pub async fn alert_status(pool: &PgPool, alert_id: DbId) -> (String, Option<Timestamp>) {
    sqlx::query_as("SELECT status, start_time FROM alerts WHERE id = $1")
        .bind(alert_id)
        .fetch_one(pool)
        .await
        .expect("fetch alert status")
}

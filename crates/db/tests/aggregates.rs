//! Integration tests for `AggregateRepo`: live counters and the clamp on
//! the derived not-responded figure.

mod common;

use chrono::Utc;
use muster_core::response::EmployeeResponse;
use muster_db::repositories::{AggregateRepo, DeliveryRecordRepo};
use sqlx::PgPool;

use common::*;

#[sqlx::test(migrations = "../../db/migrations")]
async fn active_alerts_report_per_category_counts(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    let users = [
        seed_user(&pool, org, None, "Ada", None, None).await,
        seed_user(&pool, org, None, "Ben", None, None).await,
        seed_user(&pool, org, None, "Cyd", None, None).await,
        seed_user(&pool, org, None, "Dee", None, None).await,
    ];
    DeliveryRecordRepo::create_for_recipients(&pool, alert, &users)
        .await
        .unwrap();

    DeliveryRecordRepo::record_response(&pool, alert, users[0], EmployeeResponse::Safe, None)
        .await
        .unwrap();
    DeliveryRecordRepo::record_response(&pool, alert, users[1], EmployeeResponse::Safe, None)
        .await
        .unwrap();
    DeliveryRecordRepo::record_response(&pool, alert, users[2], EmployeeResponse::NeedHelp, None)
        .await
        .unwrap();

    let aggregates = AggregateRepo::active_for_org(&pool, org).await.unwrap();
    assert_eq!(aggregates.len(), 1);

    let agg = &aggregates[0];
    assert_eq!(agg.alert_id, alert);
    assert_eq!(agg.total_recipients, 4);
    assert_eq!(agg.counts.safe, 2);
    assert_eq!(agg.counts.need_help, 1);
    assert_eq!(agg.counts.emergency_help_needed, 0);
    assert_eq!(agg.not_responded, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn alert_with_no_recipients_reports_zeroes(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;

    let aggregates = AggregateRepo::active_for_org(&pool, org).await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].alert_id, alert);
    assert_eq!(aggregates[0].total_recipients, 0);
    assert_eq!(aggregates[0].not_responded, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduled_and_resolved_alerts_are_excluded(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    seed_alert(&pool, org, "scheduled", Some(Utc::now()), None).await;
    let active = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;

    let aggregates = AggregateRepo::active_for_org(&pool, org).await.unwrap();
    assert_eq!(aggregates.len(), 1);
    assert_eq!(aggregates[0].alert_id, active);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn not_responded_clamps_when_a_response_races_fanout(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    let user = seed_user(&pool, org, None, "Ada", None, None).await;

    // The response landed before fan-out created any other records: the
    // category sum equals the total, and the derived figure must be zero,
    // never negative.
    DeliveryRecordRepo::record_response(&pool, alert, user, EmployeeResponse::Safe, None)
        .await
        .unwrap();

    let aggregates = AggregateRepo::active_for_org(&pool, org).await.unwrap();
    assert_eq!(aggregates[0].total_recipients, 1);
    assert_eq!(aggregates[0].counts.safe, 1);
    assert_eq!(aggregates[0].not_responded, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn alert_detail_includes_delivered_and_area_names(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Warehouse").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    link_alert_area(&pool, alert, area).await;

    let users = [
        seed_user(&pool, org, Some(area), "Ada", None, None).await,
        seed_user(&pool, org, Some(area), "Ben", None, None).await,
    ];
    DeliveryRecordRepo::create_for_recipients(&pool, alert, &users)
        .await
        .unwrap();
    DeliveryRecordRepo::record_response(&pool, alert, users[0], EmployeeResponse::NeedHelp, None)
        .await
        .unwrap();

    let detail = AggregateRepo::alert_detail(&pool, alert)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.areas, vec!["Warehouse".to_string()]);
    assert_eq!(detail.counts.total_recipients, 2);
    assert_eq!(detail.counts.responded, 1);
    assert_eq!(detail.counts.need_help, 1);
    assert_eq!(detail.counts.not_responded, 1);
    assert_eq!(detail.counts.delivered, 1);

    assert!(AggregateRepo::alert_detail(&pool, 9999).await.unwrap().is_none());
}

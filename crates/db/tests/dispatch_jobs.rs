//! Integration tests for `DispatchJobRepo`: claiming, backoff rescheduling,
//! dead-lettering, and recovery of abandoned claims.

mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use muster_core::dispatch::RetryDisposition;
use muster_db::repositories::DispatchJobRepo;
use sqlx::PgPool;

use common::*;

/// Force a job to be immediately claimable regardless of its backoff.
async fn make_due(pool: &PgPool, job_id: i64) {
    sqlx::query("UPDATE dispatch_jobs SET not_before = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(job_id)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn future_not_before_delays_consumption(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;

    DispatchJobRepo::enqueue(&pool, alert, false, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert!(DispatchJobRepo::claim_next(&pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claim_marks_running_and_counts_the_attempt(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;

    let enqueued = DispatchJobRepo::enqueue(&pool, alert, true, Utc::now()).await.unwrap();
    assert_eq!(enqueued.status, "pending");
    assert_eq!(enqueued.attempts, 0);

    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.id, enqueued.id);
    assert_eq!(claimed.status, "running");
    assert_eq!(claimed.attempts, 1);
    assert!(claimed.send_sms);

    // While running it is invisible to other claimants.
    assert!(DispatchJobRepo::claim_next(&pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_attempts_back_off_then_dead_letter(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    let job = DispatchJobRepo::enqueue(&pool, alert, false, Utc::now()).await.unwrap();

    // Attempt 1 fails: rescheduled 1 s out.
    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    let outcome = DispatchJobRepo::retry_or_exhaust(&pool, &claimed, "db unavailable")
        .await
        .unwrap();
    assert_eq!(outcome, RetryDisposition::Retry(StdDuration::from_secs(1)));
    let after = DispatchJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(after.status, "pending");
    assert_eq!(after.last_error.as_deref(), Some("db unavailable"));

    // Attempt 2 fails: backoff doubles.
    make_due(&pool, job.id).await;
    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.attempts, 2);
    let outcome = DispatchJobRepo::retry_or_exhaust(&pool, &claimed, "db unavailable")
        .await
        .unwrap();
    assert_eq!(outcome, RetryDisposition::Retry(StdDuration::from_secs(2)));

    // Attempt 3 fails: the budget is spent and the job is dead-lettered,
    // not silently dropped.
    make_due(&pool, job.id).await;
    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(claimed.attempts, 3);
    let outcome = DispatchJobRepo::retry_or_exhaust(&pool, &claimed, "still down")
        .await
        .unwrap();
    assert_eq!(outcome, RetryDisposition::DeadLetter);

    let dead = DispatchJobRepo::list_exhausted(&pool, None).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].id, job.id);
    assert_eq!(dead[0].last_error.as_deref(), Some("still down"));

    // Exhausted jobs are never claimable again.
    make_due(&pool, job.id).await;
    assert!(DispatchJobRepo::claim_next(&pool).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn succeeded_jobs_leave_the_queue(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    DispatchJobRepo::enqueue(&pool, alert, false, Utc::now()).await.unwrap();

    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    DispatchJobRepo::mark_succeeded(&pool, claimed.id).await.unwrap();

    let after = DispatchJobRepo::find_by_id(&pool, claimed.id).await.unwrap().unwrap();
    assert_eq!(after.status, "succeeded");
    assert!(DispatchJobRepo::claim_next(&pool).await.unwrap().is_none());
    assert!(DispatchJobRepo::list_exhausted(&pool, None).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn abandoned_claims_are_released_for_redelivery(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let alert = seed_alert(&pool, org, "active", None, Some(Utc::now())).await;
    DispatchJobRepo::enqueue(&pool, alert, false, Utc::now()).await.unwrap();

    let claimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();

    // Simulate a worker that died mid-flight.
    sqlx::query("UPDATE dispatch_jobs SET updated_at = NOW() - INTERVAL '10 minutes' WHERE id = $1")
        .bind(claimed.id)
        .execute(&pool)
        .await
        .unwrap();

    let released = DispatchJobRepo::release_stuck(&pool, StdDuration::from_secs(120))
        .await
        .unwrap();
    assert_eq!(released, 1);

    // Claimable again; the attempt counter keeps growing.
    let reclaimed = DispatchJobRepo::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(reclaimed.id, claimed.id);
    assert_eq!(reclaimed.attempts, 2);
}

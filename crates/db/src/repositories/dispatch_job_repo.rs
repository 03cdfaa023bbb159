//! Repository for the `dispatch_jobs` table, the durable dispatch queue.
//!
//! Delivery is at-least-once: `claim_next` uses `FOR UPDATE SKIP LOCKED` so
//! any number of worker processes can compete for jobs without
//! double-claiming, and `release_stuck` returns jobs whose worker died so
//! another process picks them up. Failed attempts reschedule with
//! exponential backoff until the attempt ceiling, then dead-letter.

use std::time::Duration;

use muster_core::dispatch::{disposition, RetryDisposition};
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::dispatch_job::DispatchJob;

/// Column list for `dispatch_jobs` queries.
const COLUMNS: &str = "\
    id, alert_id, send_sms, attempts, max_attempts, not_before, status, \
    last_error, created_at, updated_at";

/// Queue job states.
const STATUS_PENDING: &str = "pending";
const STATUS_RUNNING: &str = "running";
const STATUS_SUCCEEDED: &str = "succeeded";
const STATUS_EXHAUSTED: &str = "exhausted";

/// Default page size for the dead-letter view.
const DEFAULT_LIMIT: i64 = 50;

pub struct DispatchJobRepo;

impl DispatchJobRepo {
    /// Enqueue one dispatch intent, consumable no earlier than `not_before`.
    pub async fn enqueue(
        pool: &PgPool,
        alert_id: DbId,
        send_sms: bool,
        not_before: Timestamp,
    ) -> Result<DispatchJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO dispatch_jobs (alert_id, send_sms, not_before) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DispatchJob>(&query)
            .bind(alert_id)
            .bind(send_sms)
            .bind(not_before)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next due job, incrementing its attempt counter.
    ///
    /// `FOR UPDATE SKIP LOCKED` hands each job to exactly one of the
    /// competing workers at a time; a claimed job that is never acked comes
    /// back via [`release_stuck`](Self::release_stuck).
    pub async fn claim_next(pool: &PgPool) -> Result<Option<DispatchJob>, sqlx::Error> {
        let query = format!(
            "UPDATE dispatch_jobs \
             SET status = $1, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM dispatch_jobs \
                 WHERE status = $2 AND not_before <= NOW() \
                 ORDER BY not_before ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DispatchJob>(&query)
            .bind(STATUS_RUNNING)
            .bind(STATUS_PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Mark a job as successfully processed.
    pub async fn mark_succeeded(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE dispatch_jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(job_id)
            .bind(STATUS_SUCCEEDED)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Handle a failed attempt: reschedule with exponential backoff, or
    /// dead-letter once the attempt budget is spent.
    ///
    /// Either way the failure reason is recorded; exhausted jobs stay
    /// visible through [`list_exhausted`](Self::list_exhausted) instead of
    /// being dropped.
    pub async fn retry_or_exhaust(
        pool: &PgPool,
        job: &DispatchJob,
        error: &str,
    ) -> Result<RetryDisposition, sqlx::Error> {
        let outcome = disposition(job.attempts, job.max_attempts);

        match outcome {
            RetryDisposition::Retry(delay) => {
                sqlx::query(
                    "UPDATE dispatch_jobs \
                     SET status = $2, last_error = $3, \
                         not_before = NOW() + make_interval(secs => $4), \
                         updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(job.id)
                .bind(STATUS_PENDING)
                .bind(error)
                .bind(delay.as_secs_f64())
                .execute(pool)
                .await?;
            }
            RetryDisposition::DeadLetter => {
                sqlx::query(
                    "UPDATE dispatch_jobs \
                     SET status = $2, last_error = $3, updated_at = NOW() \
                     WHERE id = $1",
                )
                .bind(job.id)
                .bind(STATUS_EXHAUSTED)
                .bind(error)
                .execute(pool)
                .await?;
            }
        }

        Ok(outcome)
    }

    /// The dead-letter view: jobs that exhausted their retry budget,
    /// most recent failures first.
    pub async fn list_exhausted(
        pool: &PgPool,
        limit: Option<i64>,
    ) -> Result<Vec<DispatchJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispatch_jobs \
             WHERE status = $1 \
             ORDER BY updated_at DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DispatchJob>(&query)
            .bind(STATUS_EXHAUSTED)
            .bind(limit.unwrap_or(DEFAULT_LIMIT))
            .fetch_all(pool)
            .await
    }

    /// Return long-running claims to the pending state.
    ///
    /// A job stuck in `running` past `older_than` means its worker died
    /// mid-flight; under at-least-once semantics it must become claimable
    /// again. Returns the number of released jobs.
    pub async fn release_stuck(pool: &PgPool, older_than: Duration) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE dispatch_jobs \
             SET status = $1, updated_at = NOW() \
             WHERE status = $2 AND updated_at < NOW() - make_interval(secs => $3)",
        )
        .bind(STATUS_PENDING)
        .bind(STATUS_RUNNING)
        .bind(older_than.as_secs_f64())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<DispatchJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM dispatch_jobs WHERE id = $1");
        sqlx::query_as::<_, DispatchJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

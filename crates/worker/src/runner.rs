//! Dispatch queue consumer loop.
//!
//! Claims due jobs on a poll interval, runs the fan-out, and acknowledges
//! the result: success removes the job, failure reschedules it with
//! backoff until the attempt ceiling, after which it is dead-lettered. A
//! periodic sweep releases claims whose worker died mid-flight.

use std::time::Duration;

use muster_core::dispatch::RetryDisposition;
use muster_db::models::dispatch_job::DispatchJob;
use muster_db::repositories::DispatchJobRepo;
use muster_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::fanout::FanoutWorker;

/// How often an idle worker polls for claimable jobs.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How often the stuck-claim sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// A `running` job untouched for this long is assumed abandoned.
const STUCK_AFTER: Duration = Duration::from_secs(120);

/// Consume dispatch jobs until `cancel` fires.
///
/// Any number of processes may run this loop against the same database;
/// the claim query hands each job to exactly one of them at a time.
pub async fn run(pool: DbPool, worker: FanoutWorker, cancel: CancellationToken) {
    tracing::info!(
        poll_secs = POLL_INTERVAL.as_secs(),
        "Dispatch runner started"
    );

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut sweep = tokio::time::interval(SWEEP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Dispatch runner stopping");
                break;
            }
            _ = sweep.tick() => {
                match DispatchJobRepo::release_stuck(&pool, STUCK_AFTER).await {
                    Ok(released) if released > 0 => {
                        tracing::warn!(released, "Released abandoned dispatch claims");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Stuck-claim sweep failed"),
                }
            }
            _ = poll.tick() => {
                // Drain everything claimable before sleeping again.
                loop {
                    match DispatchJobRepo::claim_next(&pool).await {
                        Ok(Some(job)) => handle(&pool, &worker, job).await,
                        Ok(None) => break,
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to claim dispatch job");
                            break;
                        }
                    }
                    if cancel.is_cancelled() {
                        break;
                    }
                }
            }
        }
    }
}

/// Process one claimed job and acknowledge the outcome.
async fn handle(pool: &DbPool, worker: &FanoutWorker, job: DispatchJob) {
    tracing::info!(
        job_id = job.id,
        alert_id = job.alert_id,
        attempt = job.attempts,
        "Processing dispatch job"
    );

    match worker.process(&job).await {
        Ok(report) => {
            if let Err(e) = DispatchJobRepo::mark_succeeded(pool, job.id).await {
                // The job stays `running` and the stuck sweep will release
                // it; the fan-out itself is idempotent on redelivery.
                tracing::error!(job_id = job.id, error = %e, "Failed to ack dispatch job");
                return;
            }
            tracing::info!(
                job_id = job.id,
                alert_id = job.alert_id,
                recipients = report.recipients,
                records_created = report.records_created,
                push_delivered = report.push_delivered,
                push_unregistered = report.push_unregistered,
                push_failed = report.push_failed,
                sms_accepted = report.sms_accepted,
                "Dispatch job complete"
            );
        }
        Err(e) => {
            tracing::warn!(job_id = job.id, error = %e, "Dispatch job attempt failed");
            match DispatchJobRepo::retry_or_exhaust(pool, &job, &e.to_string()).await {
                Ok(RetryDisposition::Retry(delay)) => {
                    tracing::info!(
                        job_id = job.id,
                        delay_secs = delay.as_secs(),
                        "Dispatch job rescheduled"
                    );
                }
                Ok(RetryDisposition::DeadLetter) => {
                    tracing::error!(
                        job_id = job.id,
                        alert_id = job.alert_id,
                        "Dispatch job exhausted its retry budget"
                    );
                }
                Err(e) => {
                    tracing::error!(job_id = job.id, error = %e, "Failed to reschedule job");
                }
            }
        }
    }
}

//! Integration tests for the fan-out worker: idempotency under duplicate
//! job delivery, per-recipient push failure handling, and token
//! self-healing.

mod common;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use muster_db::repositories::{DeliveryRecordRepo, DispatchJobRepo};
use muster_events::{PushMessage, PushOutcome, PushResult, PushSender, SmsMessage, SmsSender};
use muster_worker::FanoutWorker;
use sqlx::PgPool;

use common::*;

// ---------------------------------------------------------------------------
// Stub senders
// ---------------------------------------------------------------------------

/// Push sender that reports configured tokens as unregistered and records
/// everything it was asked to send.
#[derive(Default)]
struct StubPushSender {
    dead_tokens: HashSet<String>,
    sent: Mutex<Vec<PushMessage>>,
}

impl StubPushSender {
    fn with_dead_token(token: &str) -> Self {
        Self {
            dead_tokens: HashSet::from([token.to_string()]),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushSender for StubPushSender {
    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<PushResult> {
        self.sent.lock().unwrap().extend(messages.iter().cloned());
        messages
            .iter()
            .map(|m| PushResult {
                user_id: m.user_id,
                token: m.token.clone(),
                outcome: if self.dead_tokens.contains(&m.token) {
                    PushOutcome::Unregistered
                } else {
                    PushOutcome::Delivered
                },
            })
            .collect()
    }
}

/// SMS sender that records phone numbers and accepts everything.
#[derive(Default)]
struct StubSmsSender {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl SmsSender for StubSmsSender {
    async fn send_batch(&self, messages: &[SmsMessage]) -> usize {
        let mut sent = self.sent.lock().unwrap();
        sent.extend(messages.iter().map(|m| m.phone_number.clone()));
        messages.len()
    }
}

async fn claimed_job(pool: &PgPool, alert_id: i64, send_sms: bool) -> muster_db::models::dispatch_job::DispatchJob {
    DispatchJobRepo::enqueue(pool, alert_id, send_sms, Utc::now())
        .await
        .unwrap();
    DispatchJobRepo::claim_next(pool).await.unwrap().unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_job_delivery_creates_no_duplicate_records(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Plant A").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;
    link_alert_area(&pool, alert, area).await;
    for name in ["Ada", "Ben", "Cyd"] {
        seed_user(&pool, org, Some(area), name, Some(&format!("tok-{name}")), None).await;
    }

    let push = Arc::new(StubPushSender::default());
    let worker = FanoutWorker::new(pool.clone(), push, Arc::new(StubSmsSender::default()));
    let job = claimed_job(&pool, alert, false).await;

    let first = worker.process(&job).await.unwrap();
    assert_eq!(first.recipients, 3);
    assert_eq!(first.records_created, 3);
    assert_eq!(first.push_delivered, 3);

    let (status, start_time) = alert_status(&pool, alert).await;
    assert_eq!(status, "active");
    let stamped = start_time.unwrap();

    // The same job delivered again: no new records, no re-stamped start.
    let second = worker.process(&job).await.unwrap();
    assert_eq!(second.records_created, 0);
    assert_eq!(
        DeliveryRecordRepo::list_for_alert(&pool, alert).await.unwrap().len(),
        3
    );
    let (_, start_time_after) = alert_status(&pool, alert).await;
    assert_eq!(start_time_after.unwrap(), stamped);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unregistered_token_is_cleared_without_failing_the_job(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Plant A").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;
    link_alert_area(&pool, alert, area).await;

    let ada = seed_user(&pool, org, Some(area), "Ada", Some("tok-ada"), None).await;
    let ben = seed_user(&pool, org, Some(area), "Ben", Some("tok-dead"), None).await;
    let cyd = seed_user(&pool, org, Some(area), "Cyd", Some("tok-cyd"), None).await;

    let push = Arc::new(StubPushSender::with_dead_token("tok-dead"));
    let worker =
        FanoutWorker::new(pool.clone(), push.clone(), Arc::new(StubSmsSender::default()));
    let job = claimed_job(&pool, alert, false).await;

    // The job succeeds even though one token was dead.
    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.push_delivered, 2);
    assert_eq!(report.push_unregistered, 1);
    assert_eq!(report.push_failed, 0);

    // Self-healing: the dead token is gone from storage.
    let token: Option<String> = sqlx::query_scalar("SELECT push_token FROM users WHERE id = $1")
        .bind(ben)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(token.is_none());

    // Successfully pushed recipients advanced to sent; the dead-token one
    // stays pending until something actually reaches them.
    for (user, expected) in [(ada, "sent"), (ben, "pending"), (cyd, "sent")] {
        let record = DeliveryRecordRepo::find(&pool, alert, user).await.unwrap().unwrap();
        assert_eq!(record.delivery_status, expected, "user {user}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn zero_recipients_completes_successfully(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Empty wing").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;
    link_alert_area(&pool, alert, area).await;

    let worker = FanoutWorker::new(
        pool.clone(),
        Arc::new(StubPushSender::default()),
        Arc::new(StubSmsSender::default()),
    );
    let job = claimed_job(&pool, alert, true).await;

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report, muster_worker::FanoutReport::default());

    // The alert still went active; there was just nobody to notify.
    let (status, _) = alert_status(&pool, alert).await;
    assert_eq!(status, "active");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sms_goes_only_to_recipients_with_phones_when_requested(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Plant A").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;
    link_alert_area(&pool, alert, area).await;

    seed_user(&pool, org, Some(area), "Ada", None, Some("+15550100")).await;
    seed_user(&pool, org, Some(area), "Ben", None, None).await;

    let sms = Arc::new(StubSmsSender::default());
    let push = Arc::new(StubPushSender::default());
    let worker = FanoutWorker::new(pool.clone(), push.clone(), sms.clone());
    let job = claimed_job(&pool, alert, true).await;

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.sms_accepted, 1);
    assert_eq!(*sms.sent.lock().unwrap(), vec!["+15550100".to_string()]);

    // Nobody had a push token, so nothing went to the push provider.
    assert_eq!(push.sent_count(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inactive_users_are_not_recipients(pool: PgPool) {
    let org = seed_org(&pool, "Acme").await;
    let area = seed_area(&pool, org, "Plant A").await;
    let alert = seed_alert(&pool, org, "scheduled", None, None).await;
    link_alert_area(&pool, alert, area).await;

    seed_user(&pool, org, Some(area), "Ada", None, None).await;
    let ben = seed_user(&pool, org, Some(area), "Ben", None, None).await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(ben)
        .execute(&pool)
        .await
        .unwrap();

    let worker = FanoutWorker::new(
        pool.clone(),
        Arc::new(StubPushSender::default()),
        Arc::new(StubSmsSender::default()),
    );
    let job = claimed_job(&pool, alert, false).await;

    let report = worker.process(&job).await.unwrap();
    assert_eq!(report.recipients, 1);
    assert!(DeliveryRecordRepo::find(&pool, alert, ben).await.unwrap().is_none());
}

//! Alert fan-out: one dispatch job in, per-recipient tracking records and
//! notifications out.

use std::sync::Arc;

use chrono::Utc;
use muster_core::types::DbId;
use muster_db::models::dispatch_job::DispatchJob;
use muster_db::models::user::Recipient;
use muster_db::repositories::{AlertRepo, DeliveryRecordRepo, UserRepo};
use muster_db::DbPool;
use muster_events::{PushMessage, PushOutcome, PushSender, SmsMessage, SmsSender};

/// What one fan-out pass did. Logged by the runner and asserted in tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub recipients: usize,
    pub records_created: u64,
    pub push_delivered: usize,
    pub push_unregistered: usize,
    pub push_failed: usize,
    pub sms_accepted: usize,
}

/// Processes dispatch jobs.
///
/// Failure semantics: database errors in the activate / resolve / record
/// steps propagate so the queue's retry policy applies; push and SMS
/// failures are absorbed per recipient and never fail the job.
pub struct FanoutWorker {
    pool: DbPool,
    push: Arc<dyn PushSender>,
    sms: Arc<dyn SmsSender>,
}

impl FanoutWorker {
    pub fn new(pool: DbPool, push: Arc<dyn PushSender>, sms: Arc<dyn SmsSender>) -> Self {
        Self { pool, push, sms }
    }

    /// Run the fan-out for one claimed job.
    ///
    /// Safe under at-least-once delivery: activation only stamps a
    /// still-scheduled alert, and record creation skips rows that already
    /// exist.
    pub async fn process(&self, job: &DispatchJob) -> Result<FanoutReport, sqlx::Error> {
        // Transition to active; a retried job finds the alert already
        // active and proceeds without re-stamping start_time.
        let alert = AlertRepo::activate(&self.pool, job.alert_id, Utc::now()).await?;

        let area_ids = AlertRepo::area_ids(&self.pool, alert.id).await?;
        let recipients = UserRepo::active_recipients_in_areas(&self.pool, &area_ids).await?;

        if recipients.is_empty() {
            tracing::info!(alert_id = alert.id, "No recipients for alert, fan-out complete");
            return Ok(FanoutReport::default());
        }

        let user_ids: Vec<_> = recipients.iter().map(|r| r.id).collect();
        let records_created =
            DeliveryRecordRepo::create_for_recipients(&self.pool, alert.id, &user_ids).await?;

        let mut report = FanoutReport {
            recipients: recipients.len(),
            records_created,
            ..FanoutReport::default()
        };

        self.push_notifications(&alert.severity, &alert.message, alert.id, &recipients, &mut report)
            .await;

        if job.send_sms {
            self.sms_notifications(&alert.message, &recipients, &mut report)
                .await;
        }

        Ok(report)
    }

    /// Batch-push to every recipient with a token.
    ///
    /// Per-token outcomes: unregistered tokens are cleared from storage so
    /// the next alert stops trying them; transient failures are logged.
    /// Nothing here fails the job.
    async fn push_notifications(
        &self,
        severity: &str,
        message: &str,
        alert_id: DbId,
        recipients: &[Recipient],
        report: &mut FanoutReport,
    ) {
        let messages: Vec<PushMessage> = recipients
            .iter()
            .filter_map(|r| {
                r.push_token.as_ref().map(|token| PushMessage {
                    user_id: r.id,
                    token: token.clone(),
                    title: format!("ALERT: {}", severity.to_uppercase()),
                    body: message.to_string(),
                    data: serde_json::json!({ "alert_id": alert_id }),
                })
            })
            .collect();

        if messages.is_empty() {
            return;
        }

        let results = self.push.send_batch(&messages).await;

        let mut pushed: Vec<DbId> = Vec::new();
        for result in results {
            match result.outcome {
                PushOutcome::Delivered => {
                    pushed.push(result.user_id);
                    report.push_delivered += 1;
                }
                PushOutcome::Unregistered => {
                    report.push_unregistered += 1;
                    tracing::info!(
                        user_id = result.user_id,
                        "Push token no longer registered, clearing it"
                    );
                    if let Err(e) = UserRepo::clear_push_token(&self.pool, result.user_id).await {
                        tracing::warn!(
                            user_id = result.user_id,
                            error = %e,
                            "Failed to clear dead push token"
                        );
                    }
                }
                PushOutcome::Failed(reason) => {
                    report.push_failed += 1;
                    tracing::warn!(
                        user_id = result.user_id,
                        alert_id,
                        reason,
                        "Push notification failed for recipient"
                    );
                }
            }
        }

        if !pushed.is_empty() {
            if let Err(e) = DeliveryRecordRepo::mark_sent(&self.pool, alert_id, &pushed).await {
                tracing::warn!(alert_id, error = %e, "Failed to advance records to sent");
            }
        }
    }

    /// Best-effort SMS to every recipient with a phone number.
    async fn sms_notifications(
        &self,
        message: &str,
        recipients: &[Recipient],
        report: &mut FanoutReport,
    ) {
        let messages: Vec<SmsMessage> = recipients
            .iter()
            .filter_map(|r| {
                r.phone_number.as_ref().map(|phone| SmsMessage {
                    phone_number: phone.clone(),
                    body: message.to_string(),
                })
            })
            .collect();

        if messages.is_empty() {
            return;
        }

        report.sms_accepted = self.sms.send_batch(&messages).await;
    }
}

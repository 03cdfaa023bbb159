//! Best-effort SMS delivery through a pluggable provider.
//!
//! SMS is a secondary channel: send failures are logged and absorbed, and
//! delivery confirmation is out of scope. No retry machinery lives here.

use std::time::Duration;

use async_trait::async_trait;

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One text message to one phone number.
#[derive(Debug, Clone)]
pub struct SmsMessage {
    pub phone_number: String,
    pub body: String,
}

/// Pluggable SMS provider.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send a batch best-effort; returns how many messages the provider
    /// accepted.
    async fn send_batch(&self, messages: &[SmsMessage]) -> usize;
}

/// SMS delivery over a provider's HTTP endpoint.
pub struct HttpSmsSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSmsSender {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from `SMS_ENDPOINT` / `SMS_API_KEY` environment variables.
    pub fn from_env() -> Self {
        let endpoint =
            std::env::var("SMS_ENDPOINT").unwrap_or_else(|_| "http://localhost:9001/v1/sms".into());
        let api_key = std::env::var("SMS_API_KEY").unwrap_or_default();
        Self::new(endpoint, api_key)
    }
}

#[async_trait]
impl SmsSender for HttpSmsSender {
    async fn send_batch(&self, messages: &[SmsMessage]) -> usize {
        let mut accepted = 0;
        for message in messages {
            let payload = serde_json::json!({
                "to": message.phone_number,
                "body": message.body,
            });
            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => accepted += 1,
                Ok(resp) => {
                    tracing::warn!(status = %resp.status(), "SMS provider rejected message");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "SMS send failed");
                }
            }
        }
        accepted
    }
}

//! Push notification delivery through a pluggable provider.
//!
//! The contract the fan-out relies on: a batch send reports an outcome per
//! token and is never fatal as a whole. A token the provider no longer
//! recognizes comes back as [`PushOutcome::Unregistered`] so the caller can
//! clear it from storage.

use std::time::Duration;

use async_trait::async_trait;
use muster_core::types::DbId;
use serde::Serialize;

/// HTTP request timeout for a single provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Messages and outcomes
// ---------------------------------------------------------------------------

/// One notification addressed to one device token.
///
/// For chat, `body` is ciphertext and `data` holds only routing metadata;
/// nothing readable ever reaches the provider.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub user_id: DbId,
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Per-token result of a batch send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Accepted by the provider.
    Delivered,
    /// The provider reports the token is no longer registered; the stored
    /// token should be cleared so we stop sending to a dead device.
    Unregistered,
    /// Transient provider or transport failure for this token only.
    Failed(String),
}

/// Outcome paired with the message it belongs to.
#[derive(Debug, Clone)]
pub struct PushResult {
    pub user_id: DbId,
    pub token: String,
    pub outcome: PushOutcome,
}

// ---------------------------------------------------------------------------
// Sender seam
// ---------------------------------------------------------------------------

/// Pluggable push provider.
///
/// Implementations report one [`PushResult`] per input message, in any
/// order. They must not fail the batch because individual tokens failed.
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<PushResult>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Push delivery over a provider's HTTP endpoint, one POST per token.
pub struct HttpPushSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPushSender {
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

    /// Build from `PUSH_ENDPOINT` / `PUSH_API_KEY` environment variables.
    pub fn from_env() -> Self {
        let endpoint = std::env::var("PUSH_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9000/v1/push".into());
        let api_key = std::env::var("PUSH_API_KEY").unwrap_or_default();
        Self::new(endpoint, api_key)
    }

    async fn send_one(&self, message: &PushMessage) -> PushOutcome {
        let payload = serde_json::json!({
            "token": message.token,
            "title": message.title,
            "body": message.body,
            "data": message.data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => PushOutcome::Delivered,
            // 404/410 are the provider's "this token no longer exists".
            Ok(resp)
                if resp.status() == reqwest::StatusCode::NOT_FOUND
                    || resp.status() == reqwest::StatusCode::GONE =>
            {
                PushOutcome::Unregistered
            }
            Ok(resp) => PushOutcome::Failed(format!("provider returned HTTP {}", resp.status())),
            Err(e) => PushOutcome::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send_batch(&self, messages: &[PushMessage]) -> Vec<PushResult> {
        let mut results = Vec::with_capacity(messages.len());
        for message in messages {
            let outcome = self.send_one(message).await;
            if let PushOutcome::Failed(reason) = &outcome {
                tracing::warn!(
                    user_id = message.user_id,
                    reason,
                    "Push delivery attempt failed"
                );
            }
            results.push(PushResult {
                user_id: message.user_id,
                token: message.token.clone(),
                outcome,
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_panic() {
        let _sender = HttpPushSender::new("http://localhost:9000/v1/push", "key");
    }

    #[test]
    fn chat_payload_carries_only_ciphertext() {
        // Guard the shape handed to providers: body is the ciphertext the
        // caller supplies, and data is routing metadata.
        let message = PushMessage {
            user_id: 1,
            token: "tok".into(),
            title: "Ada Lovelace".into(),
            body: "bm90aGluZy10by1zZWU=".into(),
            data: serde_json::json!({ "sender_id": 1, "message_id": 2 }),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["body"], "bm90aGluZy10by1zZWU=");
        assert!(value["data"].get("plaintext").is_none());
    }
}

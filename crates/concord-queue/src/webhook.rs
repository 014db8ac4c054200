use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use concord_resilience::{
    backoff_delay, CircuitBreaker, CircuitBreakerConfig, ErrorClass,
};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tokio::sync::Mutex;

use crate::job::{JobId, JobOutcome};

#[derive(Debug, Clone, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook transport error: {0}")]
    Transport(String),
    #[error("webhook receiver returned terminal status {0}")]
    Terminal(u16),
}

impl WebhookError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            WebhookError::Transport(_) => ErrorClass::Transient,
            WebhookError::Terminal(_) => ErrorClass::Validation,
        }
    }
}

#[derive(Debug, Serialize)]
struct WebhookBody {
    #[serde(rename = "jobId")]
    job_id: JobId,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(rename = "completedAt")]
    completed_at: u64,
}

/// POSTs job completion notifications with an HMAC-SHA256 body signature
/// (§4.12). Maintains one [`CircuitBreaker`] per destination host so a
/// single unresponsive receiver doesn't burn retry budget on every job.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    secret: String,
    max_attempts: u32,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl WebhookDispatcher {
    pub fn new(secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret,
            max_attempts: 5,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    async fn breaker_for(&self, host: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().await;
        breakers
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())))
            .clone()
    }

    /// `job_secret` is the per-job `Job.webhookSecret`; when absent the
    /// dispatcher's process-wide secret is used instead (§6).
    pub async fn dispatch(
        &self,
        url: &str,
        job_id: JobId,
        outcome: &JobOutcome,
        job_secret: Option<&str>,
    ) -> Result<(), WebhookError> {
        let body = WebhookBody {
            job_id,
            status: match outcome {
                JobOutcome::Success(_) => "completed",
                JobOutcome::Failure(_) => "failed",
            },
            result: match outcome {
                JobOutcome::Success(v) => Some(v.clone()),
                JobOutcome::Failure(_) => None,
            },
            error: match outcome {
                JobOutcome::Failure(e) => Some(e.clone()),
                JobOutcome::Success(_) => None,
            },
            completed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        };
        let payload = serde_json::to_vec(&body).map_err(|e| WebhookError::Transport(e.to_string()))?;
        let secret = job_secret.unwrap_or(&self.secret);
        let signature = sign(secret, &payload);
        let timestamp = body.completed_at.to_string();

        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        let breaker = self.breaker_for(&host).await;

        let mut attempt = 0u32;
        loop {
            if let Some(remaining) = breaker.reject_if_open().await {
                tracing::warn!(%host, ?remaining, "webhook circuit open, dropping delivery");
                return Err(WebhookError::Transport("circuit open".to_string()));
            }

            let response = self
                .http
                .post(url)
                .header("X-Webhook-Signature", &signature)
                .header("X-Webhook-Timestamp", &timestamp)
                .header("Content-Type", "application/json")
                .timeout(Duration::from_secs(10))
                .body(payload.clone())
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    breaker.record_success().await;
                    return Ok(());
                }
                Ok(resp) if resp.status().is_client_error() => {
                    breaker.record_success().await;
                    tracing::warn!(%host, status = %resp.status(), "webhook receiver rejected delivery, not retrying");
                    return Err(WebhookError::Terminal(resp.status().as_u16()));
                }
                Ok(resp) => {
                    breaker.record_failure().await;
                    tracing::warn!(%host, status = %resp.status(), attempt, "webhook delivery failed, will retry");
                }
                Err(e) => {
                    breaker.record_failure().await;
                    tracing::warn!(%host, error = %e, attempt, "webhook transport error, will retry");
                }
            }

            attempt += 1;
            if attempt >= self.max_attempts {
                tracing::warn!(%host, "webhook delivery exhausted retries, dropping");
                return Err(WebhookError::Transport("exhausted retries".to_string()));
            }
            let delay = backoff_delay(attempt - 1, Duration::from_millis(500), Duration::from_secs(30));
            tokio::time::sleep(delay).await;
        }
    }
}

pub(crate) fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::job::{JobId, JobOutcome};
use crate::metrics::MetricsRegistry;
use crate::queue::JobQueue;
use crate::webhook::WebhookDispatcher;

/// Spawn the reaper as a background tokio task (§4.11 ADDED). Scans for
/// jobs whose visibility deadline elapsed and returns them to `pending`
/// (or to the DLQ once `attempts >= maxRetries`) — the concrete mechanism
/// behind §4.10's "Visibility" paragraph. A job the reaper kills gets the
/// same failure webhook as one killed by an explicit `nack`: the DLQ
/// transition is what triggers the callback, not which code path caused it.
pub fn spawn_reaper(queue: JobQueue, webhook: Arc<WebhookDispatcher>, metrics: MetricsRegistry, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let report = queue.reap_expired().await;
            for id in &report.reclaimed {
                info!(job_id = %id, "reaper reclaimed stale job");
                metrics.reaper_reclaimed.inc();
            }
            for id in &report.dead {
                warn!(job_id = %id, "reaper moved job to dead letter queue");
                metrics.reaper_failed.inc();
                notify_reaped(&queue, &webhook, *id).await;
            }
        }
    });
}

async fn notify_reaped(queue: &JobQueue, webhook: &Arc<WebhookDispatcher>, job_id: JobId) {
    let record = match queue.fetch(job_id).await {
        Ok(record) => record,
        Err(e) => {
            warn!(%job_id, error = %e, "failed to fetch reaped job for webhook dispatch");
            return;
        }
    };
    let Some(url) = record.callback_url else {
        return;
    };
    let outcome = record
        .outcome
        .unwrap_or_else(|| JobOutcome::Failure("job exceeded its visibility timeout and retry budget".to_string()));
    let webhook = webhook.clone();
    let secret = record.webhook_secret;
    tokio::spawn(async move {
        if let Err(e) = webhook.dispatch(&url, job_id, &outcome, secret.as_deref()).await {
            warn!(%job_id, error = %e, "webhook delivery failed");
        }
    });
}

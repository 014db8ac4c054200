use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::job::JobId;
use crate::queue::JobQueue;

/// Spawns a heartbeat loop that refreshes `job_id`'s visibility deadline
/// every `interval` (§4.11 ADDED). Returns a `watch::Sender` — drop it to
/// stop the heartbeat when the task body finishes.
pub fn spawn_heartbeat(queue: JobQueue, job_id: JobId, interval: Duration) -> watch::Sender<()> {
    let (stop_tx, mut stop_rx) = watch::channel(());

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match queue.touch_visibility(job_id).await {
                        Ok(()) => debug!(%job_id, "heartbeat sent"),
                        Err(e) => warn!(%job_id, error = %e, "heartbeat failed"),
                    }
                }
                _ = stop_rx.changed() => {
                    debug!(%job_id, "heartbeat stopped");
                    break;
                }
            }
        }
    });

    stop_tx
}

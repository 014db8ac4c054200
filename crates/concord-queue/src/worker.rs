use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::backend::NackDisposition;
use crate::heartbeat::spawn_heartbeat;
use crate::job::{DequeuedJob, JobOutcome, JobTask, Priority};
use crate::metrics::{MetricsRegistry, PriorityLabel, QueueTerminalLabel};
use crate::queue::JobQueue;
use crate::reaper::spawn_reaper;
use crate::webhook::WebhookDispatcher;

/// A job's error, produced by the code executing a [`JobTask`] (§4.11 "Task
/// bodies"). `retryable = false` is a terminal failure.
#[derive(Debug, Clone)]
pub struct TaskError {
    pub message: String,
    pub retryable: bool,
}

impl TaskError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Executes one [`JobTask`] kind. The orchestrator binary supplies the
/// concrete implementation; this crate only knows how to run it inside the
/// dequeue/heartbeat/ack loop.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &JobTask) -> Result<serde_json::Value, TaskError>;
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub priorities: Vec<Priority>,
    pub dequeue_poll: Duration,
    pub heartbeat_interval: Duration,
    pub reaper_interval: Duration,
    pub shutdown_grace: Duration,
}

impl WorkerConfig {
    /// A "standard worker" per §4.11: reads `[premium, standard]`,
    /// allowing premium overflow.
    pub fn standard() -> Self {
        Self {
            pool_size: num_cpus(),
            priorities: vec![Priority::Premium, Priority::Standard],
            dequeue_poll: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(10),
            reaper_interval: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(30),
        }
    }

    pub fn premium() -> Self {
        Self {
            priorities: vec![Priority::Premium],
            ..Self::standard()
        }
    }

    pub fn batch() -> Self {
        Self {
            priorities: vec![Priority::Batch],
            ..Self::standard()
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// Pulls jobs, runs task bodies, reports status, triggers webhooks (§4.11).
pub struct Worker {
    queue: JobQueue,
    handler: Arc<dyn TaskHandler>,
    webhook: Arc<WebhookDispatcher>,
    metrics: MetricsRegistry,
    config: WorkerConfig,
    shutting_down: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(
        queue: JobQueue,
        handler: Arc<dyn TaskHandler>,
        webhook: Arc<WebhookDispatcher>,
        metrics: MetricsRegistry,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            handler,
            webhook,
            metrics,
            config,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs the worker pool until `shutdown` resolves, then waits up to
    /// `shutdownGrace` for in-flight tasks before returning.
    pub async fn run(self: Arc<Self>, shutdown: impl std::future::Future<Output = ()>) {
        spawn_reaper(
            self.queue.clone(),
            self.webhook.clone(),
            self.metrics.clone(),
            self.config.reaper_interval,
        );

        let in_flight = Arc::new(Semaphore::new(self.config.pool_size));
        let mut handles = Vec::with_capacity(self.config.pool_size);
        for worker_index in 0..self.config.pool_size {
            let this = self.clone();
            let in_flight = in_flight.clone();
            handles.push(tokio::spawn(async move {
                this.worker_loop(worker_index, in_flight).await;
            }));
        }

        shutdown.await;
        info!("worker received shutdown signal, draining in-flight jobs");
        self.shutting_down.store(true, Ordering::SeqCst);

        let drain = tokio::time::timeout(
            self.config.shutdown_grace,
            in_flight.acquire_many(self.config.pool_size as u32),
        )
        .await;
        if drain.is_err() {
            warn!("shutdown grace period elapsed, forcibly cancelling remaining tasks");
        }
        for handle in handles {
            handle.abort();
        }
    }

    async fn worker_loop(self: Arc<Self>, worker_index: usize, in_flight: Arc<Semaphore>) {
        loop {
            if self.shutting_down.load(Ordering::SeqCst) {
                return;
            }
            let job = match self.queue.dequeue(&self.config.priorities, self.config.dequeue_poll).await {
                Ok(Some(job)) => job,
                Ok(None) => continue,
                Err(e) => {
                    error!(worker_index, error = %e, "dequeue failed");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                }
            };

            let Ok(permit) = in_flight.clone().acquire_owned().await else {
                return;
            };
            self.execute(job).await;
            drop(permit);
        }
    }

    async fn execute(&self, job: DequeuedJob) {
        for priority in &self.config.priorities {
            self.metrics
                .queue_depth
                .get_or_create(&PriorityLabel(priority.label().to_string()))
                .set(self.queue.stats(*priority).await.map(|s| s.pending as i64).unwrap_or(0));
        }

        let stop_heartbeat = spawn_heartbeat(self.queue.clone(), job.id, self.config.heartbeat_interval);

        let handler = self.handler.clone();
        let task = job.task.clone();
        let outcome = AssertUnwindSafe(async move { handler.handle(&task).await })
            .catch_unwind()
            .await;
        let _ = stop_heartbeat.send(());

        match outcome {
            Ok(Ok(result)) => {
                if let Err(e) = self.queue.ack(job.id, result.clone()).await {
                    error!(job_id = %job.id, error = %e, "ack failed");
                }
                self.record_terminal(job.priority, "done");
                self.notify_webhook(&job, JobOutcome::Success(result)).await;
            }
            Ok(Err(task_err)) => {
                match self.queue.nack(job.id, task_err.message.clone(), task_err.retryable).await {
                    Ok(NackDisposition::Dead) => {
                        self.record_terminal(job.priority, "dead");
                        self.notify_webhook(&job, JobOutcome::Failure(task_err.message)).await;
                    }
                    Ok(NackDisposition::Requeued) => {}
                    Err(e) => error!(job_id = %job.id, error = %e, "nack failed"),
                }
            }
            Err(_panic) => {
                // A panic in a task body must not crash the worker (§4.11).
                error!(job_id = %job.id, "task body panicked, nacking as terminal");
                // retryable = false always disposes to Dead regardless of
                // attempts, but we still go through the match so a failed
                // nack (job already gone) doesn't fire a spurious webhook.
                match self.queue.nack(job.id, "task panicked", false).await {
                    Ok(NackDisposition::Dead) => {
                        self.record_terminal(job.priority, "dead");
                        self.notify_webhook(&job, JobOutcome::Failure("task panicked".to_string()))
                            .await;
                    }
                    Ok(NackDisposition::Requeued) => {}
                    Err(e) => error!(job_id = %job.id, error = %e, "nack failed after panic"),
                }
            }
        }
    }

    fn record_terminal(&self, priority: Priority, terminal_status: &str) {
        self.metrics
            .queue_jobs_total
            .get_or_create(&QueueTerminalLabel {
                priority: priority.label().to_string(),
                terminal_status: terminal_status.to_string(),
            })
            .inc();
    }

    async fn notify_webhook(&self, job: &DequeuedJob, outcome: JobOutcome) {
        let Some(url) = job.callback_url.clone() else {
            return;
        };
        let webhook = self.webhook.clone();
        let job_id = job.id;
        let secret = job.webhook_secret.clone();
        tokio::spawn(async move {
            if let Err(e) = webhook.dispatch(&url, job_id, &outcome, secret.as_deref()).await {
                warn!(%job_id, error = %e, "webhook delivery failed");
            }
        });
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::error::QueueError;
use crate::job::{
    DequeuedJob, EnqueueRequest, JobId, JobOutcome, JobRecord, JobStatus, Priority, QueueStats,
};
use concord_resilience::backoff_delay;

/// Storage behind [`crate::JobQueue`]'s public operations (§4.10 ADDED).
/// A persistent implementation can replace [`InMemoryBackend`] without
/// touching `JobQueue` itself.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    async fn enqueue(&self, priority: Priority, request: EnqueueRequest) -> Result<JobId, QueueError>;
    async fn dequeue(
        &self,
        priorities: &[Priority],
        deadline: Duration,
    ) -> Result<Option<DequeuedJob>, QueueError>;
    async fn ack(&self, id: JobId, outcome: JobOutcome) -> Result<(), QueueError>;
    /// Reports back whether the job was requeued for another attempt or
    /// landed in the DLQ, so a caller can fire the terminal-failure webhook
    /// exactly once, right where the kill actually happens.
    async fn nack(&self, id: JobId, retryable: bool, reason: String) -> Result<NackDisposition, QueueError>;
    async fn stats(&self, priority: Priority) -> Result<QueueStats, QueueError>;
    async fn fetch(&self, id: JobId) -> Result<JobRecord, QueueError>;
    /// Refreshes a running job's visibility deadline (heartbeat).
    async fn touch_visibility(&self, id: JobId) -> Result<(), QueueError>;
    /// Scans for jobs whose visibility deadline elapsed and returns them to
    /// `pending` (incrementing attempts) or to the dead-letter queue when
    /// `attempts >= maxRetries`. Returns the ids moved each way.
    async fn reap_expired(&self) -> ReapReport;
}

/// Outcome of a [`QueueBackend::nack`] call: whether the job gets another
/// attempt or has exhausted its retry budget and moved to the DLQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackDisposition {
    Requeued,
    Dead,
}

#[derive(Debug, Default, Clone)]
pub struct ReapReport {
    pub reclaimed: Vec<JobId>,
    pub dead: Vec<JobId>,
}

struct PendingEntry {
    id: JobId,
    ready_at: Instant,
}

struct RunningEntry {
    priority: Priority,
    deadline: Instant,
}

struct Meta {
    priority: Priority,
    task: crate::job::JobTask,
    callback_url: Option<String>,
    webhook_secret: Option<String>,
    attempts: u32,
    status: JobStatus,
    outcome: Option<JobOutcome>,
}

struct Inner {
    pending: HashMap<Priority, VecDeque<PendingEntry>>,
    running: HashMap<JobId, RunningEntry>,
    dead: Vec<JobId>,
    meta: HashMap<JobId, Meta>,
}

/// Default [`QueueBackend`]: per-priority `VecDeque` for FIFO pending
/// entries, a map of in-flight visibility deadlines, and a DLQ list, all
/// behind one `tokio::sync::Mutex` (§5 "Shared resources").
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
    notify: Notify,
    high_water_mark: usize,
}

impl InMemoryBackend {
    pub fn new(high_water_mark: usize) -> Self {
        let mut pending = HashMap::new();
        for p in Priority::ALL {
            pending.insert(p, VecDeque::new());
        }
        Self {
            inner: Mutex::new(Inner {
                pending,
                running: HashMap::new(),
                dead: Vec::new(),
                meta: HashMap::new(),
            }),
            notify: Notify::new(),
            high_water_mark,
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl QueueBackend for InMemoryBackend {
    async fn enqueue(&self, priority: Priority, request: EnqueueRequest) -> Result<JobId, QueueError> {
        let id = uuid::Uuid::new_v4();
        let mut inner = self.inner.lock().await;
        let queue = inner.pending.entry(priority).or_default();
        if queue.len() >= self.high_water_mark {
            return Err(QueueError::QueueFull(priority));
        }
        queue.push_back(PendingEntry {
            id,
            ready_at: Instant::now(),
        });
        inner.meta.insert(
            id,
            Meta {
                priority,
                task: request.task,
                callback_url: request.callback_url,
                webhook_secret: request.webhook_secret,
                attempts: 0,
                status: JobStatus::Pending,
                outcome: None,
            },
        );
        drop(inner);
        self.notify.notify_waiters();
        tracing::debug!(job_id = %id, priority = priority.label(), "job enqueued");
        Ok(id)
    }

    async fn dequeue(
        &self,
        priorities: &[Priority],
        deadline: Duration,
    ) -> Result<Option<DequeuedJob>, QueueError> {
        let started = Instant::now();
        loop {
            {
                let mut inner = self.inner.lock().await;
                for priority in priorities {
                    if let Some(id) = pop_ready(&mut inner, *priority) {
                        let meta = inner.meta.get_mut(&id).ok_or(QueueError::NotFound(id))?;
                        meta.status = JobStatus::Running;
                        let job_timeout = priority.job_timeout();
                        inner.running.insert(
                            id,
                            RunningEntry {
                                priority: *priority,
                                deadline: Instant::now() + job_timeout,
                            },
                        );
                        let meta = inner.meta.get(&id).unwrap();
                        return Ok(Some(DequeuedJob {
                            id,
                            priority: *priority,
                            task: meta.task.clone(),
                            callback_url: meta.callback_url.clone(),
                            webhook_secret: meta.webhook_secret.clone(),
                            attempts: meta.attempts,
                        }));
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Ok(None);
            }
            let remaining = deadline - elapsed;
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(remaining.min(Duration::from_millis(100))) => {}
            }
        }
    }

    async fn ack(&self, id: JobId, outcome: JobOutcome) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        inner.running.remove(&id).ok_or(QueueError::NotRunning(id))?;
        let meta = inner.meta.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        meta.status = JobStatus::Done;
        meta.outcome = Some(outcome);
        tracing::debug!(job_id = %id, "job acked");
        Ok(())
    }

    async fn nack(&self, id: JobId, retryable: bool, reason: String) -> Result<NackDisposition, QueueError> {
        let mut inner = self.inner.lock().await;
        let running = inner.running.remove(&id).ok_or(QueueError::NotRunning(id))?;
        let priority = running.priority;
        let disposition = requeue_or_kill(&mut inner, id, priority, retryable, reason);
        drop(inner);
        self.notify.notify_waiters();
        Ok(disposition)
    }

    async fn stats(&self, priority: Priority) -> Result<QueueStats, QueueError> {
        let inner = self.inner.lock().await;
        let pending = inner.pending.get(&priority).map(|q| q.len()).unwrap_or(0);
        let running = inner
            .running
            .values()
            .filter(|r| r.priority == priority)
            .count();
        let dead = inner
            .dead
            .iter()
            .filter(|id| inner.meta.get(*id).map(|m| m.priority) == Some(priority))
            .count();
        Ok(QueueStats {
            pending,
            running,
            dead,
        })
    }

    async fn fetch(&self, id: JobId) -> Result<JobRecord, QueueError> {
        let inner = self.inner.lock().await;
        let meta = inner.meta.get(&id).ok_or(QueueError::NotFound(id))?;
        Ok(JobRecord {
            id,
            priority: meta.priority,
            status: meta.status,
            attempts: meta.attempts,
            task: meta.task.clone(),
            callback_url: meta.callback_url.clone(),
            webhook_secret: meta.webhook_secret.clone(),
            outcome: meta.outcome.clone(),
        })
    }

    async fn touch_visibility(&self, id: JobId) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().await;
        let priority = inner
            .meta
            .get(&id)
            .map(|m| m.priority)
            .ok_or(QueueError::NotFound(id))?;
        let running = inner.running.get_mut(&id).ok_or(QueueError::NotRunning(id))?;
        running.deadline = Instant::now() + priority.job_timeout();
        Ok(())
    }

    async fn reap_expired(&self) -> ReapReport {
        let mut report = ReapReport::default();
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let expired: Vec<JobId> = inner
            .running
            .iter()
            .filter(|(_, r)| r.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in expired {
            let running = match inner.running.remove(&id) {
                Some(r) => r,
                None => continue,
            };
            let priority = running.priority;
            let max_retries = priority.max_retries();
            let attempts = inner.meta.get(&id).map(|m| m.attempts).unwrap_or(0);
            if attempts >= max_retries {
                kill(&mut inner, id, "job exceeded its visibility timeout and retry budget".to_string());
                report.dead.push(id);
            } else {
                requeue(&mut inner, id, priority, Instant::now());
                report.reclaimed.push(id);
            }
        }
        if !report.reclaimed.is_empty() {
            drop(inner);
            self.notify.notify_waiters();
        }
        report
    }
}

fn pop_ready(inner: &mut Inner, priority: Priority) -> Option<JobId> {
    let now = Instant::now();
    let queue = inner.pending.get_mut(&priority)?;
    let pos = queue.iter().position(|e| e.ready_at <= now)?;
    queue.remove(pos).map(|e| e.id)
}

fn requeue(inner: &mut Inner, id: JobId, priority: Priority, ready_at: Instant) {
    if let Some(meta) = inner.meta.get_mut(&id) {
        meta.attempts += 1;
        meta.status = JobStatus::Pending;
    }
    inner
        .pending
        .entry(priority)
        .or_default()
        .push_back(PendingEntry { id, ready_at });
}

fn kill(inner: &mut Inner, id: JobId, reason: String) {
    if let Some(meta) = inner.meta.get_mut(&id) {
        meta.status = JobStatus::Dead;
        meta.outcome = Some(JobOutcome::Failure(reason));
    }
    inner.dead.push(id);
}

fn requeue_or_kill(
    inner: &mut Inner,
    id: JobId,
    priority: Priority,
    retryable: bool,
    reason: String,
) -> NackDisposition {
    let attempts = inner.meta.get(&id).map(|m| m.attempts).unwrap_or(0);
    let max_retries = priority.max_retries();
    if retryable && attempts < max_retries {
        let delay = backoff_delay(attempts, Duration::from_secs(1), Duration::from_secs(300));
        tracing::warn!(job_id = %id, attempt = attempts, %reason, "job nacked, retrying");
        requeue(inner, id, priority, Instant::now() + delay);
        NackDisposition::Requeued
    } else {
        tracing::warn!(job_id = %id, attempt = attempts, %reason, "job nacked, moving to dead letter queue");
        kill(inner, id, reason);
        NackDisposition::Dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobTask;

    fn match_request() -> EnqueueRequest {
        EnqueueRequest {
            task: JobTask::Match {
                payload: serde_json::json!({"candidateId": "c1", "jobId": "j1"}),
            },
            callback_url: None,
            webhook_secret: None,
        }
    }

    #[tokio::test]
    async fn enqueue_then_dequeue_roundtrips() {
        let backend = InMemoryBackend::default();
        let id = backend
            .enqueue(Priority::Standard, match_request())
            .await
            .unwrap();
        let job = backend
            .dequeue(&[Priority::Standard], Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.attempts, 0);
    }

    #[tokio::test]
    async fn dequeue_respects_strict_priority_order() {
        let backend = InMemoryBackend::default();
        backend
            .enqueue(Priority::Batch, match_request())
            .await
            .unwrap();
        let premium_id = backend
            .enqueue(Priority::Premium, match_request())
            .await
            .unwrap();

        let job = backend
            .dequeue(&[Priority::Premium, Priority::Standard, Priority::Batch], Duration::from_millis(100))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.id, premium_id);
    }

    #[tokio::test]
    async fn dequeue_times_out_when_empty() {
        let backend = InMemoryBackend::default();
        let result = backend
            .dequeue(&[Priority::Standard], Duration::from_millis(20))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn nack_retryable_requeues_with_incremented_attempts() {
        let backend = InMemoryBackend::default();
        let id = backend
            .enqueue(Priority::Standard, match_request())
            .await
            .unwrap();
        backend
            .dequeue(&[Priority::Standard], Duration::from_millis(100))
            .await
            .unwrap();
        let disposition = backend.nack(id, true, "transient".into()).await.unwrap();
        assert_eq!(disposition, NackDisposition::Requeued);

        let record = backend.fetch(id).await.unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(record.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn nack_non_retryable_moves_to_dead_letter() {
        let backend = InMemoryBackend::default();
        let id = backend
            .enqueue(Priority::Standard, match_request())
            .await
            .unwrap();
        backend
            .dequeue(&[Priority::Standard], Duration::from_millis(100))
            .await
            .unwrap();
        let disposition = backend.nack(id, false, "bad request".into()).await.unwrap();
        assert_eq!(disposition, NackDisposition::Dead);

        let record = backend.fetch(id).await.unwrap();
        assert_eq!(record.status, JobStatus::Dead);
        assert!(matches!(record.outcome, Some(JobOutcome::Failure(_))));
    }

    #[tokio::test]
    async fn exceeding_max_retries_moves_to_dead_letter() {
        let backend = InMemoryBackend::default();
        let id = backend
            .enqueue(Priority::Batch, match_request())
            .await
            .unwrap();
        let mut last_disposition = NackDisposition::Requeued;
        for _ in 0..=Priority::Batch.max_retries() {
            backend
                .dequeue(&[Priority::Batch], Duration::from_millis(100))
                .await
                .unwrap();
            last_disposition = backend.nack(id, true, "retry".into()).await.unwrap();
        }
        assert_eq!(last_disposition, NackDisposition::Dead);
        let record = backend.fetch(id).await.unwrap();
        assert_eq!(record.status, JobStatus::Dead);
    }

    #[tokio::test]
    async fn queue_full_rejects_enqueue() {
        let backend = InMemoryBackend::new(1);
        backend
            .enqueue(Priority::Standard, match_request())
            .await
            .unwrap();
        let result = backend.enqueue(Priority::Standard, match_request()).await;
        assert!(matches!(result, Err(QueueError::QueueFull(Priority::Standard))));
    }

    #[tokio::test]
    async fn stats_reflect_pending_running_dead() {
        let backend = InMemoryBackend::default();
        let id = backend
            .enqueue(Priority::Standard, match_request())
            .await
            .unwrap();
        let stats = backend.stats(Priority::Standard).await.unwrap();
        assert_eq!(stats.pending, 1);

        backend
            .dequeue(&[Priority::Standard], Duration::from_millis(100))
            .await
            .unwrap();
        let stats = backend.stats(Priority::Standard).await.unwrap();
        assert_eq!(stats.running, 1);

        backend.nack(id, false, "fail".into()).await.unwrap();
        let stats = backend.stats(Priority::Standard).await.unwrap();
        assert_eq!(stats.dead, 1);
    }
}

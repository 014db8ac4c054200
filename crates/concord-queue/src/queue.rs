use std::sync::Arc;
use std::time::Duration;

use crate::backend::{NackDisposition, QueueBackend, ReapReport};
use crate::error::QueueError;
use crate::job::{DequeuedJob, EnqueueRequest, JobId, JobOutcome, JobRecord, JobTask, Priority, QueueStats};

/// Public operations over a [`QueueBackend`] (§4.10). Thin by design — all
/// retry/DLQ/visibility policy lives in the backend so a persistent backend
/// can carry the same policy without this type changing.
#[derive(Clone)]
pub struct JobQueue {
    backend: Arc<dyn QueueBackend>,
}

impl JobQueue {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory(high_water_mark: usize) -> Self {
        Self::new(Arc::new(crate::backend::InMemoryBackend::new(high_water_mark)))
    }

    pub async fn enqueue(
        &self,
        priority: Priority,
        task: JobTask,
        callback_url: Option<String>,
        webhook_secret: Option<String>,
    ) -> Result<JobId, QueueError> {
        self.backend
            .enqueue(
                priority,
                EnqueueRequest {
                    task,
                    callback_url,
                    webhook_secret,
                },
            )
            .await
    }

    /// Dequeues using strict priority across `priorities`, blocking up to
    /// `deadline` when all are empty (§4.10 "Dispatch policy").
    pub async fn dequeue(
        &self,
        priorities: &[Priority],
        deadline: Duration,
    ) -> Result<Option<DequeuedJob>, QueueError> {
        self.backend.dequeue(priorities, deadline).await
    }

    pub async fn ack(&self, id: JobId, result: serde_json::Value) -> Result<(), QueueError> {
        self.backend.ack(id, JobOutcome::Success(result)).await
    }

    pub async fn nack(
        &self,
        id: JobId,
        err: impl Into<String>,
        retryable: bool,
    ) -> Result<NackDisposition, QueueError> {
        self.backend.nack(id, retryable, err.into()).await
    }

    pub async fn stats(&self, priority: Priority) -> Result<QueueStats, QueueError> {
        self.backend.stats(priority).await
    }

    pub async fn fetch(&self, id: JobId) -> Result<JobRecord, QueueError> {
        self.backend.fetch(id).await
    }

    pub async fn touch_visibility(&self, id: JobId) -> Result<(), QueueError> {
        self.backend.touch_visibility(id).await
    }

    pub async fn reap_expired(&self) -> ReapReport {
        self.backend.reap_expired().await
    }
}

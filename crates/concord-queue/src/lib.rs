pub mod backend;
pub mod error;
pub mod heartbeat;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod reaper;
pub mod webhook;
pub mod worker;

pub use backend::{InMemoryBackend, NackDisposition, QueueBackend, ReapReport};
pub use error::QueueError;
pub use job::{
    DequeuedJob, EnqueueRequest, JobId, JobOutcome, JobRecord, JobStatus, JobTask, Priority, QueueStats,
};
pub use metrics::MetricsRegistry;
pub use queue::JobQueue;
pub use webhook::{WebhookDispatcher, WebhookError};
pub use worker::{TaskError, TaskHandler, Worker, WorkerConfig};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type JobId = Uuid;

/// Fixed attributes per priority level, §4.10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Premium,
    Standard,
    Batch,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Premium, Priority::Standard, Priority::Batch];

    pub fn job_timeout(self) -> Duration {
        match self {
            Priority::Premium => Duration::from_secs(10 * 60),
            Priority::Standard => Duration::from_secs(5 * 60),
            Priority::Batch => Duration::from_secs(30 * 60),
        }
    }

    pub fn result_ttl(self) -> Duration {
        match self {
            Priority::Premium => Duration::from_secs(24 * 3600),
            Priority::Standard => Duration::from_secs(12 * 3600),
            Priority::Batch => Duration::from_secs(48 * 3600),
        }
    }

    pub fn max_retries(self) -> u32 {
        match self {
            Priority::Premium => 5,
            Priority::Standard => 3,
            Priority::Batch => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Premium => "premium",
            Priority::Standard => "standard",
            Priority::Batch => "batch",
        }
    }
}

/// Job kinds a [`crate::Worker`] knows how to execute (§4.11). The payload
/// shape for each kind is defined by the orchestrator, not this crate; the
/// queue treats it as an opaque JSON value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobTask {
    Parse { payload: serde_json::Value },
    Match { payload: serde_json::Value },
    ParseAndMatch { payload: serde_json::Value },
}

impl JobTask {
    pub fn label(&self) -> &'static str {
        match self {
            JobTask::Parse { .. } => "parse",
            JobTask::Match { .. } => "match",
            JobTask::ParseAndMatch { .. } => "parse_and_match",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueRequest {
    pub task: JobTask,
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Per-job HMAC signing secret (§3 `Job.webhookSecret`). Falls back to
    /// the dispatcher's process-wide secret when absent.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Dead,
}

/// A job pulled off the queue and handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DequeuedJob {
    pub id: JobId,
    pub priority: Priority,
    pub task: JobTask,
    pub callback_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub running: usize,
    pub dead: usize,
}

/// Result payload stored against a completed job, for `fetch`/webhook use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JobOutcome {
    Success(serde_json::Value),
    Failure(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub priority: Priority,
    pub status: JobStatus,
    pub attempts: u32,
    pub task: JobTask,
    pub callback_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub outcome: Option<JobOutcome>,
}

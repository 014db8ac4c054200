use concord_resilience::ErrorClass;

#[derive(thiserror::Error, Debug, Clone)]
pub enum QueueError {
    #[error("job {0} not found")]
    NotFound(uuid::Uuid),
    #[error("queue {0:?} is full")]
    QueueFull(crate::job::Priority),
    #[error("job {0} already acked or nacked")]
    NotRunning(uuid::Uuid),
    #[error("internal queue error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn classify(&self) -> ErrorClass {
        match self {
            QueueError::NotFound(_) => ErrorClass::NotFound,
            QueueError::QueueFull(_) => ErrorClass::RateLimited,
            QueueError::NotRunning(_) => ErrorClass::Validation,
            QueueError::Internal(_) => ErrorClass::Internal,
        }
    }
}

use std::time::Duration;

/// Semantic error buckets shared across components; not concrete error
/// types. A component's own `thiserror` enum maps each variant onto one of
/// these via a `classify()` method, so retry/circuit-breaker/queue logic can
/// branch on the class without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Transient,
    RateLimited,
    CircuitOpen,
    Cancelled,
    Internal,
}

/// Wraps an inner call error `E` with the resilience-layer outcomes that are
/// not produced by the call itself: a tripped breaker, or a deadline.
#[derive(thiserror::Error, Debug)]
pub enum ResilienceError<E> {
    #[error(transparent)]
    Inner(E),
    #[error("circuit open, retry after {remaining:?}")]
    CircuitOpen { remaining: Duration },
    #[error("call cancelled (deadline exceeded)")]
    Cancelled,
}

impl<E> ResilienceError<E> {
    pub fn classify(&self, classify_inner: impl Fn(&E) -> ErrorClass) -> ErrorClass {
        match self {
            ResilienceError::Inner(e) => classify_inner(e),
            ResilienceError::CircuitOpen { .. } => ErrorClass::CircuitOpen,
            ResilienceError::Cancelled => ErrorClass::Cancelled,
        }
    }
}

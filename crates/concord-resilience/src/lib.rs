//! Circuit breaker, retry-with-backoff, and timeout wrappers for calls to
//! external dependencies (geocoding, embeddings, webhooks, ...).
//!
//! Composition order when all three are used is `retry(circuit_breaker(timeout(call)))`:
//! the retry loop is outermost, so a string of failures within a single retry
//! loop can open the breaker mid-loop, at which point the remaining attempts
//! short-circuit with [`ResilienceError::CircuitOpen`] instead of re-attempting.

mod backoff;
mod breaker;
mod error;

pub use backoff::{backoff_delay, RetryPolicy};
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitStateKind};
pub use error::{ErrorClass, ResilienceError};

use std::future::Future;
use std::time::Duration;

/// Wrap a future with a hard deadline. Cancellation of the returned future
/// (e.g. the caller dropping it) propagates to `fut` since futures in Rust
/// are cooperatively cancelled on drop.
pub async fn with_timeout<F, T, E>(duration: Duration, fut: F) -> Result<T, ResilienceError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(ResilienceError::Inner(e)),
        Err(_) => Err(ResilienceError::Cancelled),
    }
}

/// Guard a call with a circuit breaker: reject immediately while open,
/// otherwise run the call and record the outcome.
pub async fn with_circuit_breaker<F, Fut, T, E>(
    breaker: &CircuitBreaker,
    call: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    if let Some(remaining) = breaker.reject_if_open().await {
        return Err(ResilienceError::CircuitOpen { remaining });
    }
    match call().await {
        Ok(v) => {
            breaker.record_success().await;
            Ok(v)
        }
        Err(e) => {
            breaker.record_failure().await;
            Err(ResilienceError::Inner(e))
        }
    }
}

/// Run `call` under timeout + circuit breaker + retry-with-backoff, in that
/// nesting order (retry outermost): each attempt is `timeout(call)`, guarded
/// by the breaker, and a failed attempt is retried only if `classify` places
/// it in `policy.retry_on`. `classify` maps the inner error to an
/// [`ErrorClass`].
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    timeout: Duration,
    classify: impl Fn(&E) -> ErrorClass,
    mut call: F,
) -> Result<T, ResilienceError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0u32;
    loop {
        if let Some(remaining) = breaker.reject_if_open().await {
            return Err(ResilienceError::CircuitOpen { remaining });
        }

        match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(v)) => {
                breaker.record_success().await;
                return Ok(v);
            }
            Ok(Err(e)) => {
                breaker.record_failure().await;
                let class = classify(&e);
                if attempt >= policy.max_retries || !policy.retry_on.contains(&class) {
                    return Err(ResilienceError::Inner(e));
                }
                tracing::debug!(attempt, ?class, "retrying after classified error");
            }
            Err(_elapsed) => {
                breaker.record_failure().await;
                if attempt >= policy.max_retries || !policy.retry_on.contains(&ErrorClass::Cancelled)
                {
                    return Err(ResilienceError::Cancelled);
                }
                tracing::debug!(attempt, "retrying after timeout");
            }
        }

        let delay = backoff_delay(attempt, policy.base_delay, policy.max_delay);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq)]
    struct Boom;

    fn classify_all_transient(_e: &Boom) -> ErrorClass {
        ErrorClass::Transient
    }

    #[tokio::test]
    async fn retry_exhaustion_surfaces_last_error() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 100,
            ..Default::default()
        });
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            retry_on: vec![ErrorClass::Transient],
        };
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<(), ResilienceError<Boom>> = retry_with_backoff(
            &policy,
            &breaker,
            Duration::from_secs(1),
            classify_all_transient,
            move || {
                calls2.fetch_add(1, Ordering::SeqCst);
                async { Err(Boom) }
            },
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::Inner(Boom))));
        assert_eq!(calls.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }

    #[tokio::test]
    async fn circuit_opens_after_threshold() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 2,
            timeout: Duration::from_secs(30),
            successes_needed: 2,
        });
        let policy = RetryPolicy {
            max_retries: 10,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            retry_on: vec![ErrorClass::Transient],
        };
        let result: Result<(), ResilienceError<Boom>> = retry_with_backoff(
            &policy,
            &breaker,
            Duration::from_secs(1),
            classify_all_transient,
            || async { Err(Boom) },
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::CircuitOpen { .. })));
        assert_eq!(breaker.snapshot().await.state, CircuitStateKind::Open);
    }

    #[tokio::test]
    async fn timeout_inside_retry_counts_as_one_failure() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 1,
            ..Default::default()
        });
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            retry_on: vec![],
        };
        let result: Result<(), ResilienceError<Boom>> = retry_with_backoff(
            &policy,
            &breaker,
            Duration::from_millis(5),
            classify_all_transient,
            || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert_eq!(breaker.snapshot().await.failure_count, 1);
    }
}

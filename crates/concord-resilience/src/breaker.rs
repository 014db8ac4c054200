use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Three-state circuit breaker guarding a single external dependency.
/// One instance per dependency name; the name itself lives with the caller
/// (e.g. as a map key), not inside the breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<CircuitState>,
}

#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub threshold: u32,
    pub timeout: Duration,
    pub successes_needed: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            timeout: Duration::from_secs(30),
            successes_needed: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitStateKind {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitState {
    kind: CircuitStateKind,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    successes_in_half_open: u32,
}

/// Point-in-time view of a breaker, for metrics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitSnapshot {
    pub state: CircuitStateKind,
    pub failure_count: u32,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState {
                kind: CircuitStateKind::Closed,
                failure_count: 0,
                last_failure_at: None,
                successes_in_half_open: 0,
            }),
        }
    }

    /// If the circuit is open and the timeout has not elapsed, returns
    /// `Some(remaining)`. If the timeout has elapsed, transitions to
    /// half-open and returns `None` (the call is allowed through as a probe).
    pub async fn reject_if_open(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        if state.kind != CircuitStateKind::Open {
            return None;
        }
        let elapsed = state
            .last_failure_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::MAX);
        if elapsed >= self.config.timeout {
            tracing::debug!("circuit half-open probe");
            state.kind = CircuitStateKind::HalfOpen;
            state.successes_in_half_open = 0;
            None
        } else {
            Some(self.config.timeout - elapsed)
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        match state.kind {
            CircuitStateKind::Closed => {
                state.failure_count = 0;
            }
            CircuitStateKind::HalfOpen => {
                state.successes_in_half_open += 1;
                if state.successes_in_half_open >= self.config.successes_needed {
                    tracing::info!("circuit closed after half-open successes");
                    state.kind = CircuitStateKind::Closed;
                    state.failure_count = 0;
                    state.successes_in_half_open = 0;
                }
            }
            CircuitStateKind::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.last_failure_at = Some(Instant::now());
        match state.kind {
            CircuitStateKind::Closed => {
                state.failure_count += 1;
                if state.failure_count >= self.config.threshold {
                    tracing::warn!(threshold = self.config.threshold, "circuit opened");
                    state.kind = CircuitStateKind::Open;
                }
            }
            CircuitStateKind::HalfOpen => {
                tracing::warn!("circuit re-opened after half-open failure");
                state.kind = CircuitStateKind::Open;
                state.successes_in_half_open = 0;
            }
            CircuitStateKind::Open => {}
        }
    }

    pub async fn snapshot(&self) -> CircuitSnapshot {
        let state = self.state.lock().await;
        CircuitSnapshot {
            state: state.kind,
            failure_count: state.failure_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 3,
            ..Default::default()
        });
        for _ in 0..2 {
            b.record_failure().await;
            assert_eq!(b.snapshot().await.state, CircuitStateKind::Closed);
        }
        b.record_failure().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::Open);
        assert!(b.reject_if_open().await.is_some());
    }

    #[tokio::test]
    async fn success_resets_failure_count_while_closed() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 3,
            ..Default::default()
        });
        b.record_failure().await;
        b.record_failure().await;
        b.record_success().await;
        assert_eq!(b.snapshot().await.failure_count, 0);
    }

    #[tokio::test]
    async fn half_open_closes_after_successes_needed() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 1,
            timeout: Duration::from_millis(5),
            successes_needed: 2,
        });
        b.record_failure().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::Open);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(b.reject_if_open().await.is_none()); // transitions to half-open
        assert_eq!(b.snapshot().await.state, CircuitStateKind::HalfOpen);

        b.record_success().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::HalfOpen);
        b.record_success().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let b = CircuitBreaker::new(CircuitBreakerConfig {
            threshold: 1,
            timeout: Duration::from_millis(5),
            successes_needed: 2,
        });
        b.record_failure().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _ = b.reject_if_open().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::HalfOpen);

        b.record_failure().await;
        assert_eq!(b.snapshot().await.state, CircuitStateKind::Open);
    }
}

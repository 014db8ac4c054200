use std::time::Duration;

use crate::ErrorClass;

/// Retry configuration: how many times to retry, the base/max delay for the
/// exponential backoff, and which error classes are eligible for retry at
/// all. Non-listed classes are never retried regardless of remaining budget.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retry_on: Vec<ErrorClass>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_on: vec![ErrorClass::Transient, ErrorClass::RateLimited],
        }
    }
}

/// `min(maxDelay, baseDelay * 2^attempt) * uniform(0.9, 1.1)`.
///
/// `attempt` is 0-indexed (the delay before the *first* retry uses
/// `attempt == 0`). Never negative, never exceeds `max_delay`.
pub fn backoff_delay(attempt: u32, base_delay: Duration, max_delay: Duration) -> Duration {
    let exp = 2u64.saturating_pow(attempt.min(32));
    let raw = base_delay.saturating_mul(exp as u32).min(max_delay);
    let jitter = 0.9 + rand::random::<f64>() * 0.2;
    Duration::from_secs_f64((raw.as_secs_f64() * jitter).max(0.0)).min(max_delay)
}

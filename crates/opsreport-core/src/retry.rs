//! Resilient-call wrapper with exponential backoff
//!
//! Wraps a remote call and retries it only when the failure is classified as
//! a rate limit. Any other error propagates immediately. Each invocation
//! owns its own delay counter, so concurrent tasks back off independently.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ReportError, Result};

/// Retry policy for a resilient call.
///
/// `max_attempts` counts total invocations, not retries after the first.
/// The per-call-site constants differ in the field (5 attempts at 2s for
/// recommendation lookups, 10 at 10s for load-balancer describes), so the
/// policy stays configurable instead of fixing one set.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
        }
    }
}

/// Invoke `call` until it succeeds, fails with a non-rate-limit error, or
/// exhausts the policy's attempts.
///
/// On a rate-limit error the wrapper sleeps for the current delay and then
/// doubles it. Exhaustion yields `ReportError::RetriesExhausted` naming the
/// operation.
pub async fn with_backoff<F, Fut, T>(
    operation: &str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;

    for attempt in 1..=max_attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_rate_limited() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max = max_attempts,
                    delay_secs = delay.as_secs(),
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
            Err(err) if err.is_rate_limited() => {
                warn!(operation, attempt, max = max_attempts, "retries exhausted");
                break;
            }
            Err(err) => return Err(err),
        }
    }

    Err(ReportError::RetriesExhausted {
        operation: operation.to_string(),
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited() -> ReportError {
        ReportError::RateLimited("Throttling".into())
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let policy = RetryPolicy::default();
        let result = with_backoff("test", &policy, || async { Ok::<_, ReportError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_rate_limit_with_doubling_delay() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let policy = RetryPolicy::new(5, Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let result = with_backoff("test", &policy, || {
            let attempts = attempts_clone.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(rate_limited())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        // 3 failures then success: 4 invocations, sleeps of 2 + 4 + 8 seconds
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(14));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_propagate_without_sleeping() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let policy = RetryPolicy::default();

        let started = tokio::time::Instant::now();
        let result = with_backoff("test", &policy, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ReportError::Credentials("bad token".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(ReportError::Credentials(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_yields_distinct_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let policy = RetryPolicy::new(3, Duration::from_secs(2));

        let result = with_backoff("describe things", &policy, || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(rate_limited())
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match result {
            Err(ReportError::RetriesExhausted {
                operation,
                attempts,
            }) => {
                assert_eq!(operation, "describe things");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }
}

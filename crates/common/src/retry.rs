//! Bounded retry for calls whose result needs structured parsing
//!
//! Only errors classified as retryable by [`AppError::is_retryable`](crate::errors::AppError::is_retryable) are
//! attempted again; anything else is returned on the spot.

use crate::errors::Result;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and delay schedule
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Retry immediately, used by tests
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_randomization_factor(0.0)
            .with_multiplier(2.0)
            .with_max_interval(self.base_delay * 10)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Run `attempt_fn` until it succeeds, fails fatally, or the budget runs out.
///
/// The closure receives the 1-based attempt number. On exhaustion the last
/// error is returned so the caller can decide how to degrade.
pub async fn retry_bounded<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt_fn: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut schedule = policy.schedule();
    let mut attempt = 1;

    loop {
        match attempt_fn(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = schedule.next_backoff().unwrap_or(policy.base_delay);
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(operation, attempts = attempt, error = %e, "Retries exhausted");
                }
                return Err(e);
            }
        }
    }
}

/// Same as [`retry_bounded`] but gives up with `None` instead of failing.
/// Only errors for which [`AppError::aborts_run`](crate::errors::AppError::aborts_run) holds still propagate.
pub async fn retry_or_give_up<T, F, Fut>(policy: &RetryPolicy, operation: &str, attempt_fn: F) -> Result<Option<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match retry_bounded(policy, operation, attempt_fn).await {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.aborts_run() => Err(e),
        Err(e) => {
            if !e.is_retryable() {
                warn!(operation, error = %e, "Giving up on non-retryable error");
            }
            Ok(None)
        }
    }
}

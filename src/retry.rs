//! Bounded exponential backoff around network operations.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::observability::LOG_TARGET;

/// Delay before the first retry; each further retry doubles it.
pub const RETRY_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Errors that can tell whether repeating the operation may succeed.
pub trait Transient {
    /// Returns `true` when the failure is worth retrying.
    fn is_transient(&self) -> bool;
}

/// How many times, and how patiently, to repeat a transient failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: u32,
    initial_delay: Duration,
}

impl RetryPolicy {
    /// Runs every operation exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(0, RETRY_INITIAL_DELAY)
    }

    /// Allows up to `retries` repeats after the first attempt.
    #[must_use]
    pub const fn new(retries: u32, initial_delay: Duration) -> Self {
        Self {
            retries,
            initial_delay,
        }
    }

    /// Maximum number of repeats.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay before repeat number `attempt` (zero based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy is
/// exhausted. Only errors reporting [`Transient::is_transient`] are repeated.
pub(crate) async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut attempt = 0;
    loop {
        match attempt_fn().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < policy.retries && err.is_transient() => {
                let delay = policy.delay_for(attempt);
                attempt += 1;
                warn!(
                    target: LOG_TARGET,
                    operation,
                    attempt,
                    retries = policy.retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

//! Exponential backoff for transient processor failures.
//!
//! Only errors the settlement taxonomy marks transient (network faults,
//! processor 5xx) are retried; rejections and validation errors fail
//! immediately so a declined card is never hammered.

use causeway_core::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy for calls to the payment processor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial call
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the exponential backoff
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry budget.
    #[must_use]
    pub const fn new(max_retries: usize, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay for a given attempt number: `initial_delay * 2^attempt`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(2u32.saturating_pow(exp))
            .unwrap_or(self.max_delay);

        delay.min(self.max_delay)
    }
}

/// Run `operation`, retrying with backoff while it fails with a
/// [transient](SettlementError::is_transient) error.
///
/// # Errors
///
/// Returns the final error once the budget is exhausted, or the first
/// non-transient error immediately.
pub async fn retry_transient<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Processor call succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Transient processor failure, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::error!(
                        attempt,
                        error = %err,
                        "Processor call failed after max retries"
                    );
                }
                return Err(err);
            }
        }
    }
}

//! Bounded exponential-backoff retry for event handlers.

use std::time::Duration;

/// Retry parameters applied to event-handler invocations.
///
/// Commands are never retried; the caller is waiting synchronously and is
/// better placed to decide whether a retry is safe.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Treated as at least 1.
    pub max_attempts: u32,

    /// Delay before the second attempt.
    pub base_delay: Duration,

    /// Factor applied to the delay after each failed attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Returns the backoff delay after the given failed attempt (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// All attempts of a retried operation failed.
#[derive(Debug)]
pub struct Exhausted<E> {
    /// Number of attempts that were made.
    pub attempts: u32,

    /// The error from the final attempt.
    pub last_error: E,
}

/// Runs `op` up to `policy.max_attempts` times, sleeping with exponential
/// backoff between attempts.
///
/// `op` receives the 1-based attempt number. The first `Ok` wins; once all
/// attempts are used up the last error is returned as [`Exhausted`].
pub async fn with_retry<T, E, Op>(policy: RetryPolicy, mut op: Op) -> Result<T, Exhausted<E>>
where
    Op: AsyncFnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts => {
                return Err(Exhausted {
                    attempts: attempt,
                    last_error: error,
                });
            }
            Err(_) => {
                tokio::time::sleep(policy.backoff_delay(attempt)).await;
                attempt += 1;
            }
        }
    }
}

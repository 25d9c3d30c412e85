//! Retry with exponential backoff for transient control-plane failures.
//!
//! Each attempt reports an [`Attempt`]: done, transient (retry after a backoff
//! sleep) or fatal (stop immediately). The loop returns a [`RetryOutcome`]
//! carrying the final result and the number of attempts made, so callers and
//! tests can observe retry counts without depending on sleep timing.
//!
//! # Example
//!
//! ```ignore
//! use chaos_harness::retry::{retry_with_backoff, Attempt, RetryConfig};
//!
//! let outcome = retry_with_backoff(&RetryConfig::default(), "get PodChaos/kill-web", || async {
//!     match api.get("kill-web").await {
//!         Ok(obj) => Attempt::Done(obj),
//!         Err(e) if is_transient(&e) => Attempt::Transient(e),
//!         Err(e) => Attempt::Fatal(e),
//!     }
//! })
//! .await;
//! ```

use std::time::Duration;

use tracing::{error, warn};

/// Backoff policy for retried operations.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first (minimum 1)
    pub max_attempts: u32,
    /// Multiplier applied to `2^(attempt-1)`
    pub backoff_multiplier: f64,
    /// Lower bound for any single delay
    pub min_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_multiplier: 1.0,
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a config with a maximum number of attempts
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Default::default()
        }
    }

    /// Delay to sleep after the given (1-based) failed attempt.
    ///
    /// `multiplier * 2^(attempt-1)` seconds, clamped to `[min_delay, max_delay]`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = 2f64.powi(attempt.saturating_sub(1).min(63) as i32);
        let secs = (self.backoff_multiplier * exp).max(0.0);
        let raw = Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay);
        raw.clamp(self.min_delay, self.max_delay.max(self.min_delay))
    }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The operation succeeded
    Done(T),
    /// The operation failed in a way that may succeed on retry
    Transient(E),
    /// The operation failed permanently; do not retry
    Fatal(E),
}

/// Final result of a retried operation
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Success value or the last error seen
    pub result: Result<T, E>,
    /// Number of attempts made
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Discard the attempt count
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Execute an async operation, retrying transient failures with backoff.
///
/// Fatal failures return immediately. Transient failures are retried until
/// `max_attempts` is reached; each retry is logged before sleeping.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Attempt<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation().await {
            Attempt::Done(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Attempt::Fatal(e) => {
                return RetryOutcome {
                    result: Err(e),
                    attempts: attempt,
                }
            }
            Attempt::Transient(e) => {
                if attempt >= max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return RetryOutcome {
                        result: Err(e),
                        attempts: attempt,
                    };
                }

                let delay = config.delay_for(attempt);
                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

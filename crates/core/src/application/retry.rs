// Retry logic for remote calls (submission and status reads)
use crate::application::cancel::{sleep_or_cancel, CancelToken};
use crate::application::constants::*;
use crate::domain::RemoteError;
use crate::port::TimeProvider;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the call after the given backoff delay
    Retry(Duration),
    /// Do not retry: permanent error or attempt budget spent
    GiveUp,
}

/// Why a retried call finally gave up
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("{cause} (after {attempts} attempt(s))")]
    Failed { attempts: u32, cause: RemoteError },

    #[error("Cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Retry policy
///
/// Determines if a failed remote call should be retried based on:
/// - Error class (only `RemoteError::Transport` is retried)
/// - Attempts made so far vs. maximum attempts allowed
/// - Backoff factor for exponential delay
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_attempts` - Total attempts including the first call
    /// * `initial_delay` - Delay before the first retry
    /// * `backoff_factor` - Multiplier applied to the delay after each retry
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_factor,
        }
    }

    /// Single attempt, never retry
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    /// Reference submission policy: 2 attempts, 10s, x2
    pub fn submission_default() -> Self {
        Self::new(
            DEFAULT_SUBMIT_MAX_ATTEMPTS,
            DEFAULT_SUBMIT_INITIAL_DELAY,
            DEFAULT_SUBMIT_BACKOFF_FACTOR,
        )
    }

    /// Reference status-read policy: a failed read is fatal
    pub fn poll_read_default() -> Self {
        Self::new(
            DEFAULT_POLL_READ_MAX_ATTEMPTS,
            DEFAULT_POLL_READ_INITIAL_DELAY,
            DEFAULT_POLL_READ_BACKOFF_FACTOR,
        )
    }

    /// Backoff delay after the given failed attempt (1-based)
    ///
    /// delay = initial_delay * (backoff_factor ^ (attempt - 1)), capped at `MAX_RETRY_DELAY`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.max(1.0).powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }

    /// Decide what to do after `attempt` (1-based) failed with `error`
    pub fn should_retry(&self, attempt: u32, error: &RemoteError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::GiveUp;
        }

        if attempt >= self.max_attempts {
            warn!(
                attempt = %attempt,
                max_attempts = %self.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::GiveUp;
        }

        RetryDecision::Retry(self.delay_for(attempt))
    }
}

/// Run `operation` until it succeeds, fails permanently, exhausts the policy,
/// or `cancel` fires during a backoff sleep.
///
/// `operation` receives the 1-based attempt number.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    time_provider: &dyn TimeProvider,
    cancel: &CancelToken,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    let mut attempt: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled { attempts: attempt });
        }

        attempt += 1;
        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        match policy.should_retry(attempt, &error) {
            RetryDecision::Retry(delay) => {
                info!(
                    operation = operation_name,
                    attempt = %attempt,
                    max_attempts = %policy.max_attempts,
                    delay_ms = %delay.as_millis(),
                    error = %error,
                    "Scheduling retry"
                );
                if !sleep_or_cancel(time_provider, delay, cancel).await {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
            }
            RetryDecision::GiveUp => {
                warn!(
                    operation = operation_name,
                    attempt = %attempt,
                    retryable = error.is_retryable(),
                    error = %error,
                    "Giving up"
                );
                return Err(RetryError::Failed {
                    attempts: attempt,
                    cause: error,
                });
            }
        }
    }
}

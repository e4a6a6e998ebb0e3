//! Status Poller - reads job status on a fixed interval until terminal or deadline
//!
//! Only statuses in the terminal set {COMPLETE, FAILED, STOPPED} end the loop
//! successfully. Everything else means "keep polling".

use crate::application::cancel::{sleep_or_cancel, CancelToken};
use crate::application::constants::*;
use crate::application::retry::{run_with_retry, RetryError, RetryPolicy};
use crate::domain::{JobHandle, JobRequest, JobStatusSnapshot, RemoteError};
use crate::port::time_provider::elapsed_between;
use crate::port::{IngestionService, TimeProvider};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Poll loop settings
#[derive(Debug, Clone, PartialEq)]
pub struct PollSettings {
    /// Time between the start of two consecutive status reads
    pub interval: Duration,
    /// Deadline measured from the first read
    pub timeout: Duration,
    /// Random extra delay in `[0, max_jitter]` added to each sleep
    pub max_jitter: Duration,
    /// Retry policy for a single status read
    pub read_retry: RetryPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            max_jitter: DEFAULT_POLL_MAX_JITTER,
            read_retry: RetryPolicy::poll_read_default(),
        }
    }
}

/// Poll errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PollError {
    #[error("Ingestion job did not finish within {}s (elapsed {}s)", timeout.as_secs(), elapsed.as_secs())]
    Timeout {
        elapsed: Duration,
        timeout: Duration,
        last_snapshot: JobStatusSnapshot,
    },

    #[error("Status read failed after {attempts} attempt(s): {cause}")]
    Read {
        attempts: u32,
        elapsed: Duration,
        cause: RemoteError,
        last_snapshot: Option<JobStatusSnapshot>,
    },

    #[error("Polling cancelled after {}s", elapsed.as_secs())]
    Cancelled {
        elapsed: Duration,
        last_snapshot: Option<JobStatusSnapshot>,
    },
}

/// Status poller
pub struct StatusPoller {
    service: Arc<dyn IngestionService>,
    time_provider: Arc<dyn TimeProvider>,
    settings: PollSettings,
}

impl StatusPoller {
    pub fn new(
        service: Arc<dyn IngestionService>,
        time_provider: Arc<dyn TimeProvider>,
        settings: PollSettings,
    ) -> Self {
        Self {
            service,
            time_provider,
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Poll `handle` until a terminal status is observed or `deadline` elapses
    ///
    /// Algorithm:
    /// 1. Read status (with the read-retry policy)
    /// 2. Terminal -> return the snapshot
    /// 3. Elapsed > deadline -> `PollError::Timeout` with the last snapshot
    /// 4. Sleep the rest of the interval (+ jitter) and repeat
    ///
    /// # Errors
    /// - `PollError::Timeout` if the deadline passes while non-terminal
    /// - `PollError::Read` if a status read fails beyond its retry budget
    /// - `PollError::Cancelled` if `cancel` fires
    pub async fn poll(
        &self,
        request: &JobRequest,
        handle: &JobHandle,
        deadline: Duration,
        cancel: &CancelToken,
    ) -> Result<JobStatusSnapshot, PollError> {
        let start = self.time_provider.now_millis();
        let mut last_snapshot: Option<JobStatusSnapshot> = None;
        let mut polls: u32 = 0;

        info!(
            job_id = %handle,
            interval_s = self.settings.interval.as_secs(),
            deadline_s = deadline.as_secs(),
            "Waiting for ingestion job to finish"
        );

        loop {
            let iteration_start = self.time_provider.now_millis();

            let service = &self.service;
            let read = run_with_retry(
                &self.settings.read_retry,
                self.time_provider.as_ref(),
                cancel,
                "get_ingestion_job",
                move |_attempt| service.get_job_status(request, handle),
            )
            .await;

            let elapsed = elapsed_between(start, self.time_provider.now_millis());

            let snapshot = match read {
                Ok(snapshot) => snapshot,
                Err(RetryError::Failed { attempts, cause }) => {
                    error!(
                        job_id = %handle,
                        attempts = %attempts,
                        elapsed_s = elapsed.as_secs(),
                        error = %cause,
                        "Status read failed"
                    );
                    return Err(PollError::Read {
                        attempts,
                        elapsed,
                        cause,
                        last_snapshot,
                    });
                }
                Err(RetryError::Cancelled { .. }) => {
                    return Err(self.cancelled(handle, elapsed, last_snapshot));
                }
            };

            polls += 1;
            info!(
                job_id = %handle,
                poll = polls,
                elapsed_s = elapsed.as_secs(),
                status = %snapshot.status,
                "[{}s] status={}",
                elapsed.as_secs(),
                snapshot.status
            );

            if snapshot.is_terminal() {
                return Ok(snapshot);
            }

            if elapsed > deadline {
                warn!(
                    job_id = %handle,
                    elapsed_s = elapsed.as_secs(),
                    deadline_s = deadline.as_secs(),
                    last_status = %snapshot.status,
                    "Ingestion job deadline exceeded"
                );
                return Err(PollError::Timeout {
                    elapsed,
                    timeout: deadline,
                    last_snapshot: snapshot,
                });
            }

            let spent = elapsed_between(iteration_start, self.time_provider.now_millis());
            let wait = self.settings.interval.saturating_sub(spent) + self.jitter();
            debug!(job_id = %handle, wait_ms = %wait.as_millis(), "Sleeping until next poll");

            last_snapshot = Some(snapshot);
            if !sleep_or_cancel(self.time_provider.as_ref(), wait, cancel).await {
                let elapsed = elapsed_between(start, self.time_provider.now_millis());
                return Err(self.cancelled(handle, elapsed, last_snapshot));
            }
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = self.settings.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }

    fn cancelled(
        &self,
        handle: &JobHandle,
        elapsed: Duration,
        last_snapshot: Option<JobStatusSnapshot>,
    ) -> PollError {
        warn!(
            job_id = %handle,
            elapsed_s = elapsed.as_secs(),
            "Polling cancelled"
        );
        PollError::Cancelled {
            elapsed,
            last_snapshot,
        }
    }
}

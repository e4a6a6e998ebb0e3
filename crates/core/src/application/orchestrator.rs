// Orchestrator - sequences Submitter -> StatusPoller and maps the result into a RunOutcome
use crate::application::cancel::CancelToken;
use crate::application::poller::{PollError, PollSettings, StatusPoller};
use crate::application::retry::RetryPolicy;
use crate::application::submitter::{SubmitError, Submitter};
use crate::domain::{JobRequest, RunEvent, RunOutcome, RunState};
use crate::error::{AppError, Result};
use crate::port::time_provider::elapsed_between;
use crate::port::{IdProvider, IngestionService, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Retry policy for the start-job call
    pub submit_retry: RetryPolicy,
    /// Poll loop settings (interval, deadline, jitter, read retry)
    pub poll: PollSettings,
    /// Send a per-run client token so retried submissions are deduplicated
    pub idempotent_submission: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            submit_retry: RetryPolicy::submission_default(),
            poll: PollSettings::default(),
            idempotent_submission: true,
        }
    }
}

/// Orchestrator
///
/// Drives one `RunState` machine per call to [`Orchestrator::run`]. Runs share
/// nothing mutable, so one orchestrator can serve concurrent requests.
pub struct Orchestrator {
    submitter: Submitter,
    poller: StatusPoller,
    time_provider: Arc<dyn TimeProvider>,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn IngestionService>,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
        settings: OrchestratorSettings,
    ) -> Self {
        let client_tokens = settings.idempotent_submission.then_some(id_provider);
        let submitter = Submitter::new(
            service.clone(),
            settings.submit_retry,
            time_provider.clone(),
            client_tokens,
        );
        let poller = StatusPoller::new(service, time_provider.clone(), settings.poll);

        Self {
            submitter,
            poller,
            time_provider,
        }
    }

    /// Run one submission + supervision cycle to completion
    pub async fn run(&self, request: &JobRequest) -> Result<RunOutcome> {
        self.run_with_cancel(request, &CancelToken::never()).await
    }

    /// Same as [`Orchestrator::run`], stopping early with `RunOutcome::Cancelled`
    /// when `cancel` fires.
    ///
    /// # Errors
    /// Only on a broken invariant (e.g. a snapshot for a different job);
    /// remote failures are reported through the returned `RunOutcome`.
    pub async fn run_with_cancel(
        &self,
        request: &JobRequest,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        let run_start = self.time_provider.now_millis();
        let mut state = RunState::Init;

        while !state.is_done() {
            let event = self.next_event(&state, request, cancel, run_start).await?;
            let from = state.to_string();
            state = state.transition(event)?;
            debug!(from = %from, to = %state, "Run state transition");
        }

        let outcome = state
            .into_outcome()
            .ok_or_else(|| AppError::Internal("run loop exited before DONE".to_string()))?;
        log_outcome(&outcome);
        Ok(outcome)
    }

    async fn next_event(
        &self,
        state: &RunState,
        request: &JobRequest,
        cancel: &CancelToken,
        run_start: i64,
    ) -> Result<RunEvent> {
        match state {
            RunState::Init => match self.submitter.submit(request, cancel).await {
                Ok(started) => Ok(RunEvent::Submitted(started.handle)),
                Err(SubmitError::Failed { attempts, cause }) => {
                    Ok(RunEvent::SubmitFailed { attempts, cause })
                }
                Err(SubmitError::Cancelled { .. }) => Ok(RunEvent::Cancelled {
                    elapsed: elapsed_between(run_start, self.time_provider.now_millis()),
                    last_snapshot: None,
                }),
            },

            RunState::Submitted { handle } => {
                let deadline = self.poller.settings().timeout;
                match self.poller.poll(request, handle, deadline, cancel).await {
                    Ok(snapshot) => Ok(RunEvent::TerminalObserved(snapshot)),
                    Err(PollError::Timeout {
                        elapsed,
                        last_snapshot,
                        ..
                    }) => Ok(RunEvent::DeadlineExceeded {
                        elapsed,
                        last_snapshot,
                    }),
                    Err(PollError::Read {
                        elapsed,
                        cause,
                        last_snapshot,
                        ..
                    }) => Ok(RunEvent::ReadFailed {
                        elapsed,
                        cause,
                        last_snapshot,
                    }),
                    Err(PollError::Cancelled {
                        elapsed,
                        last_snapshot,
                    }) => Ok(RunEvent::Cancelled {
                        elapsed,
                        last_snapshot,
                    }),
                }
            }

            RunState::Done(_) => Err(AppError::Internal(
                "no further events once the run is DONE".to_string(),
            )),
        }
    }
}

fn log_outcome(outcome: &RunOutcome) {
    let job_id = outcome.handle().map(|h| h.to_string()).unwrap_or_default();
    let last_status = outcome
        .last_snapshot()
        .map(|s| s.status.to_string())
        .unwrap_or_default();

    match outcome {
        RunOutcome::Completed(_) => {
            info!(job_id = %job_id, outcome = outcome.kind(), "Ingestion job completed");
        }
        RunOutcome::Failed(_) | RunOutcome::Stopped(_) => {
            error!(
                job_id = %job_id,
                outcome = outcome.kind(),
                status = %last_status,
                failure_reasons = ?outcome.failure_reasons(),
                "Ingestion job did not complete"
            );
        }
        RunOutcome::TimedOut { elapsed, .. } => {
            error!(
                job_id = %job_id,
                outcome = outcome.kind(),
                elapsed_s = elapsed.as_secs(),
                last_status = %last_status,
                "Ingestion job timed out"
            );
        }
        RunOutcome::SubmissionError { attempts, cause } => {
            error!(
                outcome = outcome.kind(),
                attempts = %attempts,
                error = %cause,
                "Ingestion job could not be submitted"
            );
        }
        RunOutcome::PollFailed { elapsed, cause, .. } => {
            error!(
                job_id = %job_id,
                outcome = outcome.kind(),
                elapsed_s = elapsed.as_secs(),
                last_status = %last_status,
                error = %cause,
                "Lost track of ingestion job"
            );
        }
        RunOutcome::Cancelled { elapsed, .. } => {
            warn!(
                job_id = %job_id,
                outcome = outcome.kind(),
                elapsed_s = elapsed.as_secs(),
                last_status = %last_status,
                "Run cancelled"
            );
        }
    }
}

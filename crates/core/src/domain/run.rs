// Run State Machine
//
// INIT --Submitted--> SUBMITTED --TerminalObserved--> DONE(Completed|Failed|Stopped)
// INIT --SubmitFailed--> DONE(SubmissionError)
// SUBMITTED --DeadlineExceeded--> DONE(TimedOut)
// SUBMITTED --ReadFailed--> DONE(PollFailed)
// INIT|SUBMITTED --Cancelled--> DONE(Cancelled)

use std::time::Duration;

use crate::domain::error::{DomainError, RemoteError, Result};
use crate::domain::job::{JobHandle, JobStatusSnapshot};
use crate::domain::outcome::RunOutcome;

/// State of a single orchestration run. Executes once, never re-entered.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Init,
    Submitted { handle: JobHandle },
    Done(RunOutcome),
}

/// Input to the transition function
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Submitted(JobHandle),
    SubmitFailed {
        attempts: u32,
        cause: RemoteError,
    },
    TerminalObserved(JobStatusSnapshot),
    DeadlineExceeded {
        elapsed: Duration,
        last_snapshot: JobStatusSnapshot,
    },
    ReadFailed {
        elapsed: Duration,
        cause: RemoteError,
        last_snapshot: Option<JobStatusSnapshot>,
    },
    Cancelled {
        elapsed: Duration,
        last_snapshot: Option<JobStatusSnapshot>,
    },
}

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::Submitted(_) => "SUBMITTED",
            RunEvent::SubmitFailed { .. } => "SUBMIT_FAILED",
            RunEvent::TerminalObserved(_) => "TERMINAL_OBSERVED",
            RunEvent::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            RunEvent::ReadFailed { .. } => "READ_FAILED",
            RunEvent::Cancelled { .. } => "CANCELLED",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Init => write!(f, "INIT"),
            RunState::Submitted { .. } => write!(f, "SUBMITTED"),
            RunState::Done(_) => write!(f, "DONE"),
        }
    }
}

impl RunState {
    /// Apply an event and return the next state
    ///
    /// # Errors
    /// - `DomainError::InvalidStateTransition` for events not allowed in the current state
    /// - `DomainError::HandleMismatch` if a snapshot belongs to another job
    /// - `DomainError::NonTerminalStatus` if a running snapshot is offered as terminal
    pub fn transition(self, event: RunEvent) -> Result<RunState> {
        match (self, event) {
            (RunState::Init, RunEvent::Submitted(handle)) => Ok(RunState::Submitted { handle }),

            (RunState::Init, RunEvent::SubmitFailed { attempts, cause }) => Ok(RunState::Done(
                RunOutcome::SubmissionError { attempts, cause },
            )),

            (RunState::Init, RunEvent::Cancelled { elapsed, .. }) => {
                Ok(RunState::Done(RunOutcome::Cancelled {
                    handle: None,
                    elapsed,
                    last_snapshot: None,
                }))
            }

            (RunState::Submitted { handle }, RunEvent::TerminalObserved(snapshot)) => {
                ensure_same_handle(&handle, &snapshot)?;
                RunOutcome::from_terminal(snapshot).map(RunState::Done)
            }

            (
                RunState::Submitted { handle },
                RunEvent::DeadlineExceeded {
                    elapsed,
                    last_snapshot,
                },
            ) => {
                ensure_same_handle(&handle, &last_snapshot)?;
                Ok(RunState::Done(RunOutcome::TimedOut {
                    elapsed,
                    last_snapshot,
                }))
            }

            (
                RunState::Submitted { handle },
                RunEvent::ReadFailed {
                    elapsed,
                    cause,
                    last_snapshot,
                },
            ) => Ok(RunState::Done(RunOutcome::PollFailed {
                handle,
                elapsed,
                cause,
                last_snapshot,
            })),

            (
                RunState::Submitted { handle },
                RunEvent::Cancelled {
                    elapsed,
                    last_snapshot,
                },
            ) => Ok(RunState::Done(RunOutcome::Cancelled {
                handle: Some(handle),
                elapsed,
                last_snapshot,
            })),

            (state, event) => Err(DomainError::InvalidStateTransition {
                from: state.to_string(),
                event: event.name().to_string(),
            }),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunState::Done(_))
    }

    /// Final outcome, `None` unless the run is DONE
    pub fn into_outcome(self) -> Option<RunOutcome> {
        match self {
            RunState::Done(outcome) => Some(outcome),
            _ => None,
        }
    }
}

fn ensure_same_handle(handle: &JobHandle, snapshot: &JobStatusSnapshot) -> Result<()> {
    if &snapshot.job_id != handle {
        return Err(DomainError::HandleMismatch {
            expected: handle.to_string(),
            actual: snapshot.job_id.to_string(),
        });
    }
    Ok(())
}

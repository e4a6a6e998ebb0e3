// Run Outcome - the single result handed back to the caller

use std::time::Duration;

use crate::domain::error::{DomainError, RemoteError, Result};
use crate::domain::job::{JobHandle, JobStatusSnapshot, TerminalStatus};

/// Final result of one orchestration run.
///
/// Only `Completed` is safe to proceed on. Every other variant is an
/// actionable failure and must stop dependent downstream work.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Remote job reached COMPLETE
    Completed(JobStatusSnapshot),
    /// Remote job reached FAILED
    Failed(JobStatusSnapshot),
    /// Remote job reached STOPPED
    Stopped(JobStatusSnapshot),
    /// Deadline expired while the job was still non-terminal
    TimedOut {
        elapsed: Duration,
        last_snapshot: JobStatusSnapshot,
    },
    /// Job could not be submitted (permanent error or retries exhausted)
    SubmissionError { attempts: u32, cause: RemoteError },
    /// A status read failed and the read-retry budget did not absorb it
    PollFailed {
        handle: JobHandle,
        elapsed: Duration,
        cause: RemoteError,
        last_snapshot: Option<JobStatusSnapshot>,
    },
    /// Cancellation signal observed before a terminal state
    Cancelled {
        handle: Option<JobHandle>,
        elapsed: Duration,
        last_snapshot: Option<JobStatusSnapshot>,
    },
}

impl RunOutcome {
    /// Classify a terminal snapshot.
    ///
    /// Pure: the same snapshot always yields the same variant.
    ///
    /// # Errors
    /// - `DomainError::NonTerminalStatus` if the snapshot is still running
    pub fn from_terminal(snapshot: JobStatusSnapshot) -> Result<Self> {
        match snapshot.status.terminal() {
            Some(TerminalStatus::Complete) => Ok(Self::Completed(snapshot)),
            Some(TerminalStatus::Failed) => Ok(Self::Failed(snapshot)),
            Some(TerminalStatus::Stopped) => Ok(Self::Stopped(snapshot)),
            None => Err(DomainError::NonTerminalStatus(
                snapshot.status.as_str().to_string(),
            )),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Short stable label (used in logs)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Stopped(_) => "stopped",
            Self::TimedOut { .. } => "timed_out",
            Self::SubmissionError { .. } => "submission_error",
            Self::PollFailed { .. } => "poll_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Most recent snapshot observed during the run, if any
    pub fn last_snapshot(&self) -> Option<&JobStatusSnapshot> {
        match self {
            Self::Completed(s) | Self::Failed(s) | Self::Stopped(s) => Some(s),
            Self::TimedOut { last_snapshot, .. } => Some(last_snapshot),
            Self::PollFailed { last_snapshot, .. } | Self::Cancelled { last_snapshot, .. } => {
                last_snapshot.as_ref()
            }
            Self::SubmissionError { .. } => None,
        }
    }

    /// Job handle, if submission succeeded
    pub fn handle(&self) -> Option<&JobHandle> {
        match self {
            Self::PollFailed { handle, .. } => Some(handle),
            Self::Cancelled { handle, .. } => handle.as_ref(),
            _ => self.last_snapshot().map(|s| &s.job_id),
        }
    }

    /// Failure reasons reported by the service (empty when none)
    pub fn failure_reasons(&self) -> &[String] {
        self.last_snapshot()
            .map(|s| s.failure_reasons.as_slice())
            .unwrap_or(&[])
    }
}

// Final run report and process exit code

use chrono::{DateTime, Utc};
use kb_sync_core::domain::{IngestionStatistics, RemoteError, RunOutcome};
use serde::Serialize;
use std::process::ExitCode;

pub const EXIT_COMPLETED: u8 = 0;
pub const EXIT_REMOTE_FAILURE: u8 = 1;
pub const EXIT_TIMED_OUT: u8 = 2;
pub const EXIT_SUBMISSION_ERROR: u8 = 3;
pub const EXIT_POLL_FAILED: u8 = 4;
/// 128 + SIGINT
pub const EXIT_CANCELLED: u8 = 130;

/// Summary printed at the end of a run.
///
/// Optional fields are omitted when the service did not return them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<IngestionStatistics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failure_reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let snapshot = outcome.last_snapshot();
        let (elapsed, cause): (Option<u64>, Option<&RemoteError>) = match outcome {
            RunOutcome::TimedOut { elapsed, .. } | RunOutcome::Cancelled { elapsed, .. } => {
                (Some(elapsed.as_secs()), None)
            }
            RunOutcome::PollFailed { elapsed, cause, .. } => (Some(elapsed.as_secs()), Some(cause)),
            RunOutcome::SubmissionError { cause, .. } => (None, Some(cause)),
            _ => (None, None),
        };

        Self {
            outcome: outcome.kind(),
            ingestion_job_id: outcome.handle().map(|h| h.to_string()),
            status: snapshot.map(|s| s.status.to_string()),
            started_at: snapshot.and_then(|s| s.started_at),
            updated_at: snapshot.and_then(|s| s.updated_at),
            statistics: snapshot.and_then(|s| s.statistics.clone()),
            failure_reasons: outcome.failure_reasons().to_vec(),
            elapsed_seconds: elapsed,
            error: cause.map(|c| c.to_string()),
        }
    }
}

/// Only `Completed` exits 0
pub fn exit_code(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Completed(_) => EXIT_COMPLETED,
        RunOutcome::Failed(_) | RunOutcome::Stopped(_) => EXIT_REMOTE_FAILURE,
        RunOutcome::TimedOut { .. } => EXIT_TIMED_OUT,
        RunOutcome::SubmissionError { .. } => EXIT_SUBMISSION_ERROR,
        RunOutcome::PollFailed { .. } => EXIT_POLL_FAILED,
        RunOutcome::Cancelled { .. } => EXIT_CANCELLED,
    }
}

pub fn process_exit_code(outcome: &RunOutcome) -> ExitCode {
    ExitCode::from(exit_code(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kb_sync_core::domain::{IngestionStatus, JobHandle, JobStatusSnapshot};
    use std::time::Duration;

    fn snapshot(status: &str) -> JobStatusSnapshot {
        JobStatusSnapshot::new(JobHandle::new("job-1"), IngestionStatus::new(status))
    }

    #[test]
    fn test_exit_codes_distinguish_outcomes() {
        assert_eq!(exit_code(&RunOutcome::Completed(snapshot("COMPLETE"))), 0);
        assert_eq!(exit_code(&RunOutcome::Failed(snapshot("FAILED"))), 1);
        assert_eq!(exit_code(&RunOutcome::Stopped(snapshot("STOPPED"))), 1);
        assert_eq!(
            exit_code(&RunOutcome::TimedOut {
                elapsed: Duration::from_secs(1810),
                last_snapshot: snapshot("IN_PROGRESS"),
            }),
            2
        );
        assert_eq!(
            exit_code(&RunOutcome::SubmissionError {
                attempts: 2,
                cause: RemoteError::transport("down"),
            }),
            3
        );
        assert_eq!(
            exit_code(&RunOutcome::PollFailed {
                handle: JobHandle::new("job-1"),
                elapsed: Duration::from_secs(20),
                cause: RemoteError::transport("reset"),
                last_snapshot: None,
            }),
            4
        );
        assert_eq!(
            exit_code(&RunOutcome::Cancelled {
                handle: None,
                elapsed: Duration::ZERO,
                last_snapshot: None,
            }),
            130
        );
    }

    #[test]
    fn test_report_for_failed_job() {
        let mut snap = snapshot("FAILED");
        snap.failure_reasons = vec!["S3 access denied".to_string()];
        snap.statistics = Some(IngestionStatistics {
            documents_scanned: 10,
            documents_failed: 10,
            ..IngestionStatistics::default()
        });

        let report = RunReport::from_outcome(&RunOutcome::Failed(snap));
        assert_eq!(report.outcome, "failed");
        assert_eq!(report.ingestion_job_id.as_deref(), Some("job-1"));
        assert_eq!(report.status.as_deref(), Some("FAILED"));
        assert_eq!(report.failure_reasons, vec!["S3 access denied".to_string()]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ingestionJobId"], "job-1");
        assert_eq!(json["statistics"]["documents_scanned"], 10);
        assert!(json.get("startedAt").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_report_for_submission_error() {
        let report = RunReport::from_outcome(&RunOutcome::SubmissionError {
            attempts: 1,
            cause: RemoteError::permanent("ResourceNotFoundException"),
        });
        assert_eq!(report.ingestion_job_id, None);
        assert_eq!(report.status, None);
        assert!(report
            .error
            .as_deref()
            .unwrap()
            .contains("ResourceNotFoundException"));
    }
}

// Ingestion Job Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Ingestion job ID returned by the remote service on submission.
///
/// Owned by exactly one run; never re-derived or swapped mid-run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable request for one ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    knowledge_base_id: String,
    data_source_id: String,
}

impl JobRequest {
    /// Create a new request
    ///
    /// # Errors
    /// - `DomainError::ValidationError` if either identifier is blank
    pub fn new(
        knowledge_base_id: impl Into<String>,
        data_source_id: impl Into<String>,
    ) -> Result<Self> {
        let knowledge_base_id = knowledge_base_id.into();
        let data_source_id = data_source_id.into();

        if knowledge_base_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "knowledge_base_id cannot be empty".to_string(),
            ));
        }
        if data_source_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "data_source_id cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            knowledge_base_id,
            data_source_id,
        })
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    pub fn data_source_id(&self) -> &str {
        &self.data_source_id
    }
}

/// Terminal statuses (no further transition on the remote side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalStatus {
    Complete,
    Failed,
    Stopped,
}

/// Remote job status.
///
/// Kept as the raw string reported by the service. The only semantics the
/// orchestrator relies on is membership in the terminal set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngestionStatus(String);

impl IngestionStatus {
    pub const STARTING: &'static str = "STARTING";
    pub const IN_PROGRESS: &'static str = "IN_PROGRESS";
    pub const STOPPING: &'static str = "STOPPING";
    pub const COMPLETE: &'static str = "COMPLETE";
    pub const FAILED: &'static str = "FAILED";
    pub const STOPPED: &'static str = "STOPPED";

    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map to a terminal status, `None` while the job is still running
    pub fn terminal(&self) -> Option<TerminalStatus> {
        match self.0.as_str() {
            Self::COMPLETE => Some(TerminalStatus::Complete),
            Self::FAILED => Some(TerminalStatus::Failed),
            Self::STOPPED => Some(TerminalStatus::Stopped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal().is_some()
    }
}

impl std::fmt::Display for IngestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document counters reported by the service for a job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionStatistics {
    pub documents_scanned: i64,
    pub new_documents_indexed: i64,
    pub modified_documents_indexed: i64,
    pub documents_deleted: i64,
    pub documents_failed: i64,
}

/// Point-in-time read of the remote job. Produced fresh on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusSnapshot {
    pub job_id: JobHandle,
    pub status: IngestionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub statistics: Option<IngestionStatistics>,
    pub failure_reasons: Vec<String>,
}

impl JobStatusSnapshot {
    /// Snapshot carrying only an id and a status (timestamps and stats unset)
    pub fn new(job_id: JobHandle, status: IngestionStatus) -> Self {
        Self {
            job_id,
            status,
            started_at: None,
            updated_at: None,
            statistics: None,
            failure_reasons: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_ids() {
        assert!(JobRequest::new("", "ds").is_err());
        assert!(JobRequest::new("kb", "   ").is_err());

        let req = JobRequest::new("KB123", "DS456").unwrap();
        assert_eq!(req.knowledge_base_id(), "KB123");
        assert_eq!(req.data_source_id(), "DS456");
    }

    #[test]
    fn test_terminal_set() {
        assert_eq!(
            IngestionStatus::new("COMPLETE").terminal(),
            Some(TerminalStatus::Complete)
        );
        assert_eq!(
            IngestionStatus::new("FAILED").terminal(),
            Some(TerminalStatus::Failed)
        );
        assert_eq!(
            IngestionStatus::new("STOPPED").terminal(),
            Some(TerminalStatus::Stopped)
        );

        for s in ["STARTING", "IN_PROGRESS", "STOPPING", "SOMETHING_NEW", "complete"] {
            assert!(!IngestionStatus::new(s).is_terminal(), "{} is not terminal", s);
        }
    }
}

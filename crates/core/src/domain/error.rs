// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid run state transition: {from} -> {event}")]
    InvalidStateTransition { from: String, event: String },

    #[error("Snapshot for job {actual} does not belong to run job {expected}")]
    HandleMismatch { expected: String, actual: String },

    #[error("Status {0} is not terminal")]
    NonTerminalStatus(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Failure reported by (or on the way to) the remote ingestion service.
///
/// Only `Transport` is worth retrying; `Permanent` means the request itself
/// is wrong (bad identifiers, missing permission) and will fail again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Permanent error: {0}")]
    Permanent(String),
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;

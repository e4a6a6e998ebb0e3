// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod outcome;
pub mod run;

// Re-exports
pub use error::{DomainError, RemoteError};
pub use job::{
    IngestionStatistics, IngestionStatus, JobHandle, JobRequest, JobStatusSnapshot,
    TerminalStatus,
};
pub use outcome::RunOutcome;
pub use run::{RunEvent, RunState};

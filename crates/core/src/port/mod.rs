// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod ingestion_service;
pub mod time_provider;

// Re-exports
pub use crate::domain::RemoteError;
pub use id_provider::IdProvider;
pub use ingestion_service::{IngestionService, StartedJob};
pub use time_provider::TimeProvider;

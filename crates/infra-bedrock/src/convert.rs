// Bedrock Agent types -> domain types

use aws_sdk_bedrockagent::primitives::DateTime as SdkDateTime;
use aws_sdk_bedrockagent::types::{IngestionJob, IngestionJobStatistics};
use chrono::{DateTime, Utc};
use kb_sync_core::domain::{IngestionStatistics, IngestionStatus, JobHandle, JobStatusSnapshot};

pub(crate) fn snapshot_from_job(job: &IngestionJob) -> JobStatusSnapshot {
    let mut snapshot = JobStatusSnapshot::new(
        JobHandle::new(job.ingestion_job_id()),
        status_from_job(job),
    );
    snapshot.started_at = to_utc(job.started_at());
    snapshot.updated_at = to_utc(job.updated_at());
    snapshot.statistics = job.statistics().map(statistics_from_sdk);
    snapshot.failure_reasons = job.failure_reasons().to_vec();
    snapshot
}

pub(crate) fn status_from_job(job: &IngestionJob) -> IngestionStatus {
    IngestionStatus::new(job.status().as_str())
}

pub(crate) fn statistics_from_sdk(stats: &IngestionJobStatistics) -> IngestionStatistics {
    IngestionStatistics {
        documents_scanned: stats.number_of_documents_scanned(),
        new_documents_indexed: stats.number_of_new_documents_indexed(),
        modified_documents_indexed: stats.number_of_modified_documents_indexed(),
        documents_deleted: stats.number_of_documents_deleted(),
        documents_failed: stats.number_of_documents_failed(),
    }
}

/// `None` only for timestamps chrono cannot represent
pub(crate) fn to_utc(dt: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

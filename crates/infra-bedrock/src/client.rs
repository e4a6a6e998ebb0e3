//! Bedrock Agent ingestion client.
//!
//! Thin adapter: one SDK call per port method, no retries here. Retry and
//! polling policy live in the core application layer.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_bedrockagent::config::Region;
use kb_sync_core::domain::{JobHandle, JobRequest, JobStatusSnapshot};
use kb_sync_core::port::{IngestionService, RemoteError, StartedJob};
use tracing::{debug, info};

use crate::convert::{snapshot_from_job, status_from_job};
use crate::error::classify_sdk_error;

/// `IngestionService` backed by the AWS Bedrock Agent API
pub struct BedrockIngestionService {
    client: aws_sdk_bedrockagent::Client,
}

impl BedrockIngestionService {
    /// Wrap an existing SDK client
    pub fn new(client: aws_sdk_bedrockagent::Client) -> Self {
        Self { client }
    }

    /// Build a client for `region` using the default credential chain
    pub async fn from_region(region: impl Into<String>) -> Self {
        let region = region.into();
        let aws_cfg = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        info!(region = %region, "Bedrock Agent client initialised");

        Self::new(aws_sdk_bedrockagent::Client::new(&aws_cfg))
    }
}

#[async_trait]
impl IngestionService for BedrockIngestionService {
    async fn start_job(
        &self,
        request: &JobRequest,
        client_token: Option<&str>,
    ) -> Result<StartedJob, RemoteError> {
        debug!(
            knowledge_base_id = %request.knowledge_base_id(),
            data_source_id = %request.data_source_id(),
            "StartIngestionJob"
        );

        let output = self
            .client
            .start_ingestion_job()
            .knowledge_base_id(request.knowledge_base_id())
            .data_source_id(request.data_source_id())
            .set_client_token(client_token.map(str::to_string))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        // a 2xx without a job means the contract changed; retrying won't help
        let job = output
            .ingestion_job()
            .ok_or_else(|| RemoteError::permanent("StartIngestionJob returned no ingestion job"))?;

        Ok(StartedJob {
            handle: JobHandle::new(job.ingestion_job_id()),
            initial_status: status_from_job(job),
        })
    }

    async fn get_job_status(
        &self,
        request: &JobRequest,
        handle: &JobHandle,
    ) -> Result<JobStatusSnapshot, RemoteError> {
        let output = self
            .client
            .get_ingestion_job()
            .knowledge_base_id(request.knowledge_base_id())
            .data_source_id(request.data_source_id())
            .ingestion_job_id(handle.as_str())
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let job = output.ingestion_job().ok_or_else(|| {
            RemoteError::transport(format!("GetIngestionJob returned no job for {}", handle))
        })?;

        Ok(snapshot_from_job(job))
    }
}

// Submitter - starts the remote ingestion job with retry/backoff
use crate::application::cancel::CancelToken;
use crate::application::constants::MIN_CLIENT_TOKEN_LEN;
use crate::application::retry::{run_with_retry, RetryError, RetryPolicy};
use crate::domain::{JobRequest, RemoteError};
use crate::port::{IdProvider, IngestionService, StartedJob, TimeProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Submission errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Submission failed after {attempts} attempt(s): {cause}")]
    Failed { attempts: u32, cause: RemoteError },

    #[error("Submission cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

impl From<RetryError> for SubmitError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Failed { attempts, cause } => SubmitError::Failed { attempts, cause },
            RetryError::Cancelled { attempts } => SubmitError::Cancelled { attempts },
        }
    }
}

/// Submitter issues the start-job call.
///
/// Transport errors are retried according to the policy; permanent errors
/// surface immediately. With a client token provider, every attempt of one
/// submission carries the same token so the service can drop duplicates.
pub struct Submitter {
    service: Arc<dyn IngestionService>,
    retry_policy: RetryPolicy,
    time_provider: Arc<dyn TimeProvider>,
    client_tokens: Option<Arc<dyn IdProvider>>,
}

impl Submitter {
    /// Create a new submitter
    ///
    /// # Arguments
    /// * `service` - Remote ingestion service
    /// * `retry_policy` - Policy for transient start failures
    /// * `time_provider` - Clock used for backoff sleeps
    /// * `client_tokens` - Token source for idempotent submission (`None` = no token)
    pub fn new(
        service: Arc<dyn IngestionService>,
        retry_policy: RetryPolicy,
        time_provider: Arc<dyn TimeProvider>,
        client_tokens: Option<Arc<dyn IdProvider>>,
    ) -> Self {
        Self {
            service,
            retry_policy,
            time_provider,
            client_tokens,
        }
    }

    /// Submit the job and return its handle
    ///
    /// # Errors
    /// - `SubmitError::Failed` on a permanent error or once retries are exhausted
    /// - `SubmitError::Cancelled` if `cancel` fires before a successful attempt
    pub async fn submit(
        &self,
        request: &JobRequest,
        cancel: &CancelToken,
    ) -> Result<StartedJob, SubmitError> {
        let client_token = self
            .client_tokens
            .as_ref()
            .map(|p| p.generate_id())
            .filter(|token| {
                if token.len() < MIN_CLIENT_TOKEN_LEN {
                    warn!(len = token.len(), "Client token too short, submitting without one");
                    return false;
                }
                true
            });
        let token = client_token.as_deref();

        info!(
            knowledge_base_id = %request.knowledge_base_id(),
            data_source_id = %request.data_source_id(),
            idempotent = token.is_some(),
            "Submitting ingestion job"
        );

        let service = &self.service;
        let result = run_with_retry(
            &self.retry_policy,
            self.time_provider.as_ref(),
            cancel,
            "start_ingestion_job",
            move |_attempt| service.start_job(request, token),
        )
        .await;

        match result {
            Ok(started) => {
                info!(
                    job_id = %started.handle,
                    initial_status = %started.initial_status,
                    "Started ingestion job"
                );
                Ok(started)
            }
            Err(e) => {
                error!(
                    knowledge_base_id = %request.knowledge_base_id(),
                    data_source_id = %request.data_source_id(),
                    error = %e,
                    "Failed to start ingestion job"
                );
                Err(e.into())
            }
        }
    }
}

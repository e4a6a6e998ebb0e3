// Ingestion Service Port
// Abstraction over the managed knowledge-base service (start job / read job status)

use crate::domain::{IngestionStatus, JobHandle, JobRequest, JobStatusSnapshot, RemoteError};
use async_trait::async_trait;

/// Result of a successful start call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedJob {
    pub handle: JobHandle,
    pub initial_status: IngestionStatus,
}

/// Ingestion Service trait
///
/// Implementations:
/// - BedrockIngestionService: AWS Bedrock Agent (StartIngestionJob / GetIngestionJob)
/// - ScriptedIngestionService: replays canned responses (tests)
///
/// Implementations must classify every failure as `RemoteError::Transport`
/// (worth retrying) or `RemoteError::Permanent` (request is wrong).
#[async_trait]
pub trait IngestionService: Send + Sync {
    /// Start a new ingestion job for the request's data source.
    ///
    /// Not idempotent unless `client_token` is given and the service honours it.
    async fn start_job(
        &self,
        request: &JobRequest,
        client_token: Option<&str>,
    ) -> Result<StartedJob, RemoteError>;

    /// Read the current status of a job
    async fn get_job_status(
        &self,
        request: &JobRequest,
        handle: &JobHandle,
    ) -> Result<JobStatusSnapshot, RemoteError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::port::TimeProvider;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One recorded `start_job` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StartCall {
        pub at_millis: Option<i64>,
        pub client_token: Option<String>,
    }

    /// One recorded `get_job_status` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StatusCall {
        pub at_millis: Option<i64>,
        pub job_id: JobHandle,
    }

    /// Scripted ingestion service.
    ///
    /// Start responses and status responses are consumed in order. When the
    /// start script is empty a fresh `job-N` handle is returned; when the status
    /// script is empty the fallback status (if any) is repeated forever.
    pub struct ScriptedIngestionService {
        clock: Option<Arc<dyn TimeProvider>>,
        start_script: Mutex<VecDeque<Result<StartedJob, RemoteError>>>,
        status_script: Mutex<VecDeque<Result<String, RemoteError>>>,
        fallback_status: Mutex<Option<String>>,
        start_calls: Mutex<Vec<StartCall>>,
        status_calls: Mutex<Vec<StatusCall>>,
    }

    impl ScriptedIngestionService {
        pub fn new() -> Self {
            Self {
                clock: None,
                start_script: Mutex::new(VecDeque::new()),
                status_script: Mutex::new(VecDeque::new()),
                fallback_status: Mutex::new(None),
                start_calls: Mutex::new(Vec::new()),
                status_calls: Mutex::new(Vec::new()),
            }
        }

        /// Record call timestamps from `clock`
        pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
            self.clock = Some(clock);
            self
        }

        pub fn push_start_ok(&self, job_id: impl Into<String>) -> &Self {
            self.start_script.lock().unwrap().push_back(Ok(StartedJob {
                handle: JobHandle::new(job_id),
                initial_status: IngestionStatus::new(IngestionStatus::STARTING),
            }));
            self
        }

        pub fn push_start_err(&self, error: RemoteError) -> &Self {
            self.start_script.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn push_status(&self, status: impl Into<String>) -> &Self {
            self.status_script
                .lock()
                .unwrap()
                .push_back(Ok(status.into()));
            self
        }

        pub fn push_status_err(&self, error: RemoteError) -> &Self {
            self.status_script.lock().unwrap().push_back(Err(error));
            self
        }

        /// Status returned once the script runs dry
        pub fn repeat_status(&self, status: impl Into<String>) -> &Self {
            *self.fallback_status.lock().unwrap() = Some(status.into());
            self
        }

        pub fn start_calls(&self) -> Vec<StartCall> {
            self.start_calls.lock().unwrap().clone()
        }

        pub fn status_calls(&self) -> Vec<StatusCall> {
            self.status_calls.lock().unwrap().clone()
        }

        pub fn start_call_count(&self) -> usize {
            self.start_calls.lock().unwrap().len()
        }

        pub fn status_call_count(&self) -> usize {
            self.status_calls.lock().unwrap().len()
        }

        fn now(&self) -> Option<i64> {
            self.clock.as_ref().map(|c| c.now_millis())
        }
    }

    impl Default for ScriptedIngestionService {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl IngestionService for ScriptedIngestionService {
        async fn start_job(
            &self,
            _request: &JobRequest,
            client_token: Option<&str>,
        ) -> Result<StartedJob, RemoteError> {
            let call_number = {
                let mut calls = self.start_calls.lock().unwrap();
                calls.push(StartCall {
                    at_millis: self.now(),
                    client_token: client_token.map(str::to_string),
                });
                calls.len()
            };

            let scripted = self.start_script.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                Ok(StartedJob {
                    handle: JobHandle::new(format!("job-{}", call_number)),
                    initial_status: IngestionStatus::new(IngestionStatus::STARTING),
                })
            })
        }

        async fn get_job_status(
            &self,
            _request: &JobRequest,
            handle: &JobHandle,
        ) -> Result<JobStatusSnapshot, RemoteError> {
            self.status_calls.lock().unwrap().push(StatusCall {
                at_millis: self.now(),
                job_id: handle.clone(),
            });

            let scripted = self.status_script.lock().unwrap().pop_front();
            let status = match scripted {
                Some(result) => result?,
                None => self
                    .fallback_status
                    .lock()
                    .unwrap()
                    .clone()
                    .ok_or_else(|| RemoteError::transport("status script exhausted"))?,
            };

            let mut snapshot =
                JobStatusSnapshot::new(handle.clone(), IngestionStatus::new(status.clone()));
            if status == IngestionStatus::FAILED {
                snapshot.failure_reasons = vec!["scripted failure".to_string()];
            }
            Ok(snapshot)
        }
    }
}

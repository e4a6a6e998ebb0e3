//! Runner configuration
//!
//! Sources, later wins:
//! 1. Built-in defaults
//! 2. `AWS_*` variables (`AWS_REGION`, `AWS_KNOWLEDGE_BASE_ID`, `AWS_DATA_SOURCE_ID`)
//! 3. `KB_SYNC_*` variables (poll/retry tuning)
//!
//! A `.env` file in the working directory is loaded into the process
//! environment before this runs.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use kb_sync_core::application::constants::*;
use kb_sync_core::application::{OrchestratorSettings, PollSettings, RetryPolicy};
use kb_sync_core::domain::JobRequest;
use kb_sync_core::AppError;
use serde::Deserialize;

const DEFAULT_REGION: &str = "us-east-1";

/// Settings for one sync run
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncConfig {
    /// AWS region of the knowledge base
    pub region: String,
    #[serde(default)]
    pub knowledge_base_id: String,
    #[serde(default)]
    pub data_source_id: String,
    pub poll_interval_seconds: u64,
    pub timeout_seconds: u64,
    pub submit_max_attempts: u32,
    pub submit_initial_delay_seconds: u64,
    pub submit_backoff_factor: f64,
    pub poll_read_max_attempts: u32,
    /// Upper bound of the random delay added to each poll sleep
    pub poll_jitter_millis: u64,
    pub idempotent_submission: bool,
}

impl SyncConfig {
    /// Load from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_sources(None)
    }

    /// Load with `vars` standing in for the process environment (tests)
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_sources(Some(vars))
    }

    fn from_sources(vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("region", DEFAULT_REGION)?
            .set_default(
                "poll_interval_seconds",
                DEFAULT_POLL_INTERVAL.as_secs() as i64,
            )?
            .set_default("timeout_seconds", DEFAULT_POLL_TIMEOUT.as_secs() as i64)?
            .set_default("submit_max_attempts", DEFAULT_SUBMIT_MAX_ATTEMPTS as i64)?
            .set_default(
                "submit_initial_delay_seconds",
                DEFAULT_SUBMIT_INITIAL_DELAY.as_secs() as i64,
            )?
            .set_default("submit_backoff_factor", DEFAULT_SUBMIT_BACKOFF_FACTOR)?
            .set_default(
                "poll_read_max_attempts",
                DEFAULT_POLL_READ_MAX_ATTEMPTS as i64,
            )?
            .set_default(
                "poll_jitter_millis",
                DEFAULT_POLL_MAX_JITTER.as_millis() as i64,
            )?
            .set_default("idempotent_submission", true)?
            .add_source(
                Environment::with_prefix("AWS")
                    .try_parsing(true)
                    .source(vars.clone()),
            )
            .add_source(
                Environment::with_prefix("KB_SYNC")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()
    }

    /// Reject settings the run cannot work with
    pub fn validate(&self) -> Result<(), AppError> {
        if self.region.trim().is_empty() {
            return Err(AppError::Config("AWS_REGION must not be empty".to_string()));
        }
        if self.knowledge_base_id.trim().is_empty() {
            return Err(AppError::Config(
                "AWS_KNOWLEDGE_BASE_ID is required".to_string(),
            ));
        }
        if self.data_source_id.trim().is_empty() {
            return Err(AppError::Config("AWS_DATA_SOURCE_ID is required".to_string()));
        }
        if self.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "KB_SYNC_POLL_INTERVAL_SECONDS must be > 0".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(AppError::Config(
                "KB_SYNC_TIMEOUT_SECONDS must be > 0".to_string(),
            ));
        }
        if self.submit_max_attempts == 0 || self.poll_read_max_attempts == 0 {
            return Err(AppError::Config("attempt counts must be >= 1".to_string()));
        }
        if !self.submit_backoff_factor.is_finite() || self.submit_backoff_factor < 1.0 {
            return Err(AppError::Config(format!(
                "KB_SYNC_SUBMIT_BACKOFF_FACTOR must be finite and >= 1 (got {})",
                self.submit_backoff_factor
            )));
        }
        Ok(())
    }

    pub fn job_request(&self) -> Result<JobRequest, AppError> {
        Ok(JobRequest::new(
            self.knowledge_base_id.trim(),
            self.data_source_id.trim(),
        )?)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            submit_retry: RetryPolicy::new(
                self.submit_max_attempts,
                Duration::from_secs(self.submit_initial_delay_seconds),
                self.submit_backoff_factor,
            ),
            poll: PollSettings {
                interval: Duration::from_secs(self.poll_interval_seconds),
                timeout: Duration::from_secs(self.timeout_seconds),
                max_jitter: Duration::from_millis(self.poll_jitter_millis),
                read_retry: RetryPolicy::new(
                    self.poll_read_max_attempts,
                    DEFAULT_POLL_READ_INITIAL_DELAY,
                    DEFAULT_POLL_READ_BACKOFF_FACTOR,
                ),
            },
            idempotent_submission: self.idempotent_submission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
            ("AWS_DATA_SOURCE_ID", "DS456"),
        ]))
        .unwrap();

        assert_eq!(conf.region, "us-east-1");
        assert_eq!(conf.poll_interval_seconds, 10);
        assert_eq!(conf.timeout_seconds, 1800);
        assert!(conf.idempotent_submission);
        conf.validate().unwrap();

        let settings = conf.orchestrator_settings();
        assert_eq!(settings, OrchestratorSettings::default());
    }

    #[test]
    fn test_overrides() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_REGION", "eu-west-1"),
            ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
            ("AWS_DATA_SOURCE_ID", "DS456"),
            ("KB_SYNC_POLL_INTERVAL_SECONDS", "5"),
            ("KB_SYNC_TIMEOUT_SECONDS", "600"),
            ("KB_SYNC_SUBMIT_MAX_ATTEMPTS", "4"),
            ("KB_SYNC_POLL_READ_MAX_ATTEMPTS", "3"),
            ("KB_SYNC_POLL_JITTER_MILLIS", "750"),
            ("KB_SYNC_IDEMPOTENT_SUBMISSION", "false"),
        ]))
        .unwrap();
        conf.validate().unwrap();

        assert_eq!(conf.region, "eu-west-1");
        let settings = conf.orchestrator_settings();
        assert_eq!(settings.poll.interval, Duration::from_secs(5));
        assert_eq!(settings.poll.timeout, Duration::from_secs(600));
        assert_eq!(settings.poll.max_jitter, Duration::from_millis(750));
        assert_eq!(settings.poll.read_retry.max_attempts, 3);
        assert_eq!(settings.submit_retry.max_attempts, 4);
        assert!(!settings.idempotent_submission);
    }

    #[test]
    fn test_missing_identifiers_rejected() {
        let conf = SyncConfig::from_vars(vars(&[("AWS_DATA_SOURCE_ID", "DS456")])).unwrap();
        assert!(matches!(conf.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
            ("AWS_DATA_SOURCE_ID", "DS456"),
            ("KB_SYNC_POLL_INTERVAL_SECONDS", "0"),
        ]))
        .unwrap();
        assert!(conf.validate().is_err());
    }

    #[test]
    fn test_backoff_below_one_rejected() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
            ("AWS_DATA_SOURCE_ID", "DS456"),
            ("KB_SYNC_SUBMIT_BACKOFF_FACTOR", "0.5"),
        ]))
        .unwrap();
        assert!(conf.validate().is_err());
    }

    #[test]
    fn test_non_finite_backoff_rejected() {
        for factor in ["inf", "-inf"] {
            let conf = SyncConfig::from_vars(vars(&[
                ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
                ("AWS_DATA_SOURCE_ID", "DS456"),
                ("KB_SYNC_SUBMIT_BACKOFF_FACTOR", factor),
            ]))
            .unwrap();
            assert!(
                matches!(conf.validate(), Err(AppError::Config(_))),
                "{} should be rejected",
                factor
            );
        }
    }

    #[test]
    fn test_large_attempt_budget_accepted() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_KNOWLEDGE_BASE_ID", "KB123"),
            ("AWS_DATA_SOURCE_ID", "DS456"),
            ("KB_SYNC_SUBMIT_MAX_ATTEMPTS", "100"),
            ("KB_SYNC_POLL_READ_MAX_ATTEMPTS", "100"),
        ]))
        .unwrap();
        conf.validate().unwrap();

        let settings = conf.orchestrator_settings();
        assert_eq!(settings.submit_retry.delay_for(99), MAX_RETRY_DELAY);
        assert_eq!(settings.poll.read_retry.delay_for(99), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_job_request_from_config() {
        let conf = SyncConfig::from_vars(vars(&[
            ("AWS_KNOWLEDGE_BASE_ID", " KB123 "),
            ("AWS_DATA_SOURCE_ID", "DS456"),
        ]))
        .unwrap();
        let request = conf.job_request().unwrap();
        assert_eq!(request.knowledge_base_id(), "KB123");
        assert_eq!(request.data_source_id(), "DS456");
    }
}

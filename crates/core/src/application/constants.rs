// Orchestrator constants (No magic values)
use std::time::Duration;

/// Total submission attempts (first call + retries)
pub const DEFAULT_SUBMIT_MAX_ATTEMPTS: u32 = 2;

/// Delay before the first submission retry (10s)
pub const DEFAULT_SUBMIT_INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Multiplier applied to the delay after each failed submission
pub const DEFAULT_SUBMIT_BACKOFF_FACTOR: f64 = 2.0;

/// Upper bound for any single retry backoff (15 min)
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(15 * 60);

/// Time between status reads (10s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Give up polling after 30 minutes
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Status read attempts per poll (1 = a failed read ends the run)
pub const DEFAULT_POLL_READ_MAX_ATTEMPTS: u32 = 1;

/// Delay before retrying a failed status read (2s)
pub const DEFAULT_POLL_READ_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Multiplier for status read retry delays
pub const DEFAULT_POLL_READ_BACKOFF_FACTOR: f64 = 2.0;

/// Upper bound of random extra delay added to each poll interval (off)
pub const DEFAULT_POLL_MAX_JITTER: Duration = Duration::ZERO;

/// Minimum client token length accepted by StartIngestionJob
pub const MIN_CLIENT_TOKEN_LEN: usize = 33;

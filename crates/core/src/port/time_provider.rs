// Time Provider Port (for testability)

use async_trait::async_trait;
use std::time::Duration;

/// Time provider interface (allows mocking in tests)
///
/// Both reading the clock and sleeping go through this port so the
/// submission backoff and the poll loop can be driven without real sleeps.
#[async_trait]
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Suspend the current task for `duration`
    async fn sleep(&self, duration: Duration);
}

/// System time provider (production)
pub struct SystemTimeProvider;

#[async_trait]
impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Milliseconds between two readings, clamped at zero
pub fn elapsed_between(start_millis: i64, now_millis: i64) -> Duration {
    Duration::from_millis(now_millis.saturating_sub(start_millis).max(0) as u64)
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    /// Manual clock: `sleep` advances virtual time instantly and records the request.
    ///
    /// A frozen clock never wakes from `sleep` (useful to race against cancellation).
    pub struct ManualTimeProvider {
        now: AtomicI64,
        sleeps: Mutex<Vec<Duration>>,
        frozen: bool,
    }

    impl ManualTimeProvider {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
                sleeps: Mutex::new(Vec::new()),
                frozen: false,
            }
        }

        pub fn frozen(start_millis: i64) -> Self {
            Self {
                frozen: true,
                ..Self::new(start_millis)
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.now
                .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
        }

        /// All sleep requests in call order
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TimeProvider for ManualTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
            if self.frozen {
                std::future::pending::<()>().await;
            }
            self.advance(duration);
            tokio::task::yield_now().await;
        }
    }
}

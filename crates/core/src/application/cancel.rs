// Run Cancellation Token

use crate::port::TimeProvider;
use std::time::Duration;
use tokio::sync::watch;

/// Cancellation signal checked by the submission backoff and the poll loop
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Token that is never cancelled
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the cancellation signal.
    ///
    /// Pends forever if the sender is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Cancellation sender
pub struct CancelSender {
    tx: watch::Sender<bool>,
}

impl CancelSender {
    /// Signal cancellation to every token of this channel
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation channel
pub fn cancel_channel() -> (CancelSender, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelSender { tx }, CancelToken { rx })
}

/// Sleep through the time provider unless cancelled first.
///
/// Returns `false` if the token fired before the sleep finished.
pub async fn sleep_or_cancel(
    time_provider: &dyn TimeProvider,
    duration: Duration,
    cancel: &CancelToken,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = time_provider.sleep(duration) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::time_provider::mocks::ManualTimeProvider;

    #[tokio::test]
    async fn test_never_token_does_not_fire() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());

        let clock = ManualTimeProvider::new(0);
        assert!(sleep_or_cancel(&clock, Duration::from_secs(5), &token).await);
        assert_eq!(clock.now_millis(), 5_000);
    }

    #[tokio::test]
    async fn test_cancel_wakes_waiters() {
        let (tx, token) = cancel_channel();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        tx.cancel();
        waiter.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_frozen_sleep() {
        let (tx, token) = cancel_channel();
        let clock = ManualTimeProvider::frozen(0);

        let sleeper = {
            let token = token.clone();
            tokio::spawn(async move {
                sleep_or_cancel(&clock, Duration::from_secs(3600), &token).await
            })
        };

        tokio::task::yield_now().await;
        tx.cancel();
        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_sleep() {
        let (tx, token) = cancel_channel();
        tx.cancel();

        let clock = ManualTimeProvider::new(0);
        assert!(!sleep_or_cancel(&clock, Duration::from_secs(5), &token).await);
        assert!(clock.sleeps().is_empty());
    }
}

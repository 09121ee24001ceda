//! Shared cancellation handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::TransportError;

/// One abort handle spans the lifetime of a decoder instance. Every pending
/// wait (backoff sleep, queued flush) observes it and unwinds with
/// [`TransportError::Aborted`] once it is tripped.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trip the handle. Idempotent.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the handle has been tripped.
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on abort.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    /// Sleep for `duration` unless aborted first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), TransportError> {
        tokio::select! {
            _ = self.aborted() => Err(TransportError::Aborted),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

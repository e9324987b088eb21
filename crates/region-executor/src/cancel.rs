//! Page-level cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Fires cancellation for one page request. Cloneable; any clone may cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes a page's cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelSignal { rx })
}

impl CancelHandle {
    /// Cancel the page. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Cancel after `delay`, on a background task.
    pub fn cancel_after(&self, delay: Duration) -> tokio::task::JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(after_ms = delay.as_millis() as u64, "cancelling page");
            handle.cancel();
        })
    }

    /// Whether cancellation has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    /// Whether cancellation has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until cancellation fires. Pends forever if every handle is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_wakes_signal() {
        let (handle, mut signal) = cancel_pair();
        assert!(!signal.is_cancelled());

        let waiter = tokio::spawn(async move {
            signal.cancelled().await;
            true
        });
        handle.cancel();
        assert!(waiter.await.unwrap());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_cancelled_before_wait() {
        let (handle, mut signal) = cancel_pair();
        handle.cancel();
        handle.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_does_not_fire() {
        let mut signal = CancelSignal::never();
        let fired = tokio::time::timeout(Duration::from_secs(60), signal.cancelled()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_delay() {
        let (handle, mut signal) = cancel_pair();
        handle.cancel_after(Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!signal.is_cancelled());
        signal.cancelled().await;
        assert!(handle.is_cancelled());
    }
}

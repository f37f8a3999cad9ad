//! The single scan-wide cancellation primitive (§5).
//!
//! Threaded Orchestrator → Executor → Transport → Pacer. Built on
//! `tokio::sync::watch` so every waiter (an `acquire`, a `fetch`, a
//! backoff sleep) can `select!` against it without polling.

use tokio::sync::watch;

#[derive(Clone)]
pub struct CancellationToken {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the token is cancelled. Intended for `tokio::select!`
    /// alongside the operation being raced against cancellation.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        // A send error means the sender was dropped without ever
        // cancelling; treat that the same as "never cancelled".
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());
        token.cancel();
        tokio::time::timeout(Duration::from_millis(200), handle)
            .await
            .expect("cancelled() should resolve promptly")
            .unwrap();
    }

    #[test]
    fn is_cancelled_reflects_state() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}

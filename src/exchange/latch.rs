//! One-shot completion latch.
//!
//! Several independent signals race to terminate the same logical exchange:
//! a `run_finished` event, the `[DONE]` sentinel, callback-level completion,
//! natural stream end, abort. The latch guarantees exactly one of them
//! resolves the exchange; every later fire is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::callbacks::StreamComplete;
use crate::event::ErrorInfo;

/// Terminal resolution of one exchange: completion xor error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Completed(StreamComplete),
    Failed(ErrorInfo),
}

impl ExchangeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed(_))
    }
}

/// Set-once flag guarding both resolve and reject of one exchange.
pub struct CompletionLatch {
    tx: Mutex<Option<oneshot::Sender<ExchangeOutcome>>>,
    fired: AtomicBool,
}

impl CompletionLatch {
    /// Create a latch and the receiver its single resolution is delivered
    /// to.
    pub fn new() -> (Arc<Self>, oneshot::Receiver<ExchangeOutcome>) {
        let (tx, rx) = oneshot::channel();
        let latch = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            fired: AtomicBool::new(false),
        });
        (latch, rx)
    }

    /// Attempt to resolve the exchange. Returns true for the single call
    /// that wins; every other call is a no-op returning false.
    pub fn fire(&self, outcome: ExchangeOutcome) -> bool {
        let sender = self.tx.lock().expect("latch poisoned").take();
        match sender {
            Some(tx) => {
                self.fired.store(true, Ordering::SeqCst);
                // The receiver may already be gone on caller-side abandon;
                // the latch still counts as fired.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed() -> ExchangeOutcome {
        ExchangeOutcome::Completed(StreamComplete::default())
    }

    fn failed() -> ExchangeOutcome {
        ExchangeOutcome::Failed(ErrorInfo {
            code: "E".to_string(),
            message: "boom".to_string(),
            details: None,
        })
    }

    #[tokio::test]
    async fn test_first_fire_wins() {
        let (latch, rx) = CompletionLatch::new();
        assert!(!latch.is_fired());
        assert!(latch.fire(completed()));
        assert!(latch.is_fired());
        assert!(!latch.fire(failed()));
        assert!(!latch.fire(completed()));

        let outcome = rx.await.unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_fire_after_receiver_dropped_still_latches() {
        let (latch, rx) = CompletionLatch::new();
        drop(rx);
        assert!(latch.fire(failed()));
        assert!(latch.is_fired());
        assert!(!latch.fire(completed()));
    }

    #[tokio::test]
    async fn test_concurrent_fires_resolve_once() {
        let (latch, rx) = CompletionLatch::new();
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let latch = Arc::clone(&latch);
            tasks.push(tokio::spawn(async move { latch.fire(completed()) }));
        }
        let mut wins = 0;
        for task in tasks {
            if task.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert!(rx.await.is_ok());
    }
}

//! Cooperative cancellation for discovery runs
//!
//! A signal handler sets the token; the engine checks it between topics
//! and between search results. Papers already persisted stay persisted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// A shared stop flag.
///
/// Clones share state, so the binary can hand one clone to a signal task
/// and another to the engine.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Signal cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Cancel this token on the first Ctrl-C / SIGINT.
    ///
    /// Must be called from within a tokio runtime.
    pub fn cancel_on_ctrl_c(&self) -> tokio::task::JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupt received, finishing the current topic before stopping");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "Could not install interrupt handler"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn clones_observe_cancel() {
        let token = CancellationToken::new();
        let engine_side = token.clone();
        token.cancel();
        assert!(engine_side.is_cancelled());
    }

    #[tokio::test]
    async fn ctrl_c_listener_can_be_aborted() {
        let token = CancellationToken::new();
        let handle = token.cancel_on_ctrl_c();
        handle.abort();
        assert!(!token.is_cancelled());
    }
}

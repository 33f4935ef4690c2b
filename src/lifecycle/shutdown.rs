//! Shutdown coordination for the relay.

use std::time::Duration;

use tokio::sync::broadcast;

use crate::net::connection::SessionTracker;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Wait up to `grace` for every session to end.
    ///
    /// Sessions still running afterwards are dropped with the runtime, which
    /// still runs their cleanup.
    pub async fn drain(&self, tracker: &SessionTracker, grace: Duration) -> bool {
        let active = tracker.active_count();
        if active == 0 {
            return true;
        }

        tracing::info!(active_sessions = active, grace = ?grace, "Draining client sessions");
        let drained = tracker.wait_for_idle(grace).await;
        if !drained {
            tracing::warn!(
                active_sessions = tracker.active_count(),
                "Drain deadline passed, closing remaining sessions"
            );
        }
        drained
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

//! Session lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Count live client sessions so shutdown can drain them
//! - Keep the active-sessions gauge in step with reality

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Tracks active sessions for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new session. Returns a guard that decrements on drop.
    pub fn track(&self, peer: SocketAddr) -> SessionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        metrics::record_session_opened();
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
            peer,
        }
    }

    /// Get current active session count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every session has ended or `deadline` passes.
    /// Returns `true` if the relay drained cleanly.
    pub async fn wait_for_idle(&self, deadline: Duration) -> bool {
        let drained = async {
            while self.active_count() > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        tokio::time::timeout(deadline, drained).await.is_ok()
    }
}

/// Guard that tracks a session's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<AtomicU64>,
    id: SessionId,
    peer: SocketAddr,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::record_session_closed();
        tracing::trace!(session_id = %self.id, peer = %self.peer, "Session untracked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[test]
    fn session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }

    #[test]
    fn tracker_counts() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track(peer());
        let guard2 = tracker.track(peer());
        assert_eq!(tracker.active_count(), 2);
        assert_eq!(guard1.peer(), peer());

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn wait_for_idle_times_out_while_sessions_live() {
        let tracker = SessionTracker::new();
        let guard = tracker.track(peer());
        assert!(!tracker.wait_for_idle(Duration::from_millis(100)).await);

        drop(guard);
        assert!(tracker.wait_for_idle(Duration::from_millis(100)).await);
    }
}

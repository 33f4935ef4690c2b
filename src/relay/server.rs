//! Accept loop: one session task per client, all sharing one backend.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::net::connection::SessionTracker;
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::relay::remote::{RemoteConnectionManager, SharedRemote};
use crate::relay::session::{ClientSession, SessionSettings};
use crate::relay::transform::{ResponseTransform, SwapTrailingBytes};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(50);

/// TCP relay server.
pub struct ProxyServer {
    config: ProxyConfig,
    remote: SharedRemote,
    transform: Arc<dyn ResponseTransform>,
    settings: SessionSettings,
    tracker: SessionTracker,
}

impl ProxyServer {
    /// Create a server with the default trailing-byte swap transform.
    pub fn new(config: ProxyConfig) -> Self {
        let remote = RemoteConnectionManager::from_config(&config).into_shared();
        let settings = SessionSettings::from_config(&config);

        Self {
            config,
            remote,
            transform: Arc::new(SwapTrailingBytes),
            settings,
            tracker: SessionTracker::new(),
        }
    }

    /// Replace the response transform.
    pub fn with_transform(mut self, transform: impl ResponseTransform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    /// Handle to the shared backend connection.
    pub fn remote(&self) -> SharedRemote {
        Arc::clone(&self.remote)
    }

    pub fn tracker(&self) -> SessionTracker {
        self.tracker.clone()
    }

    /// Bind the configured port on all interfaces.
    pub async fn bind(&self) -> Result<Listener, ListenerError> {
        Listener::bind(&self.config.listener).await
    }

    /// Accept clients until `shutdown` fires.
    ///
    /// Sessions already running are left to finish on their own; pair with
    /// `SessionTracker::wait_for_idle` to drain them.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            remote = %self.config.remote.address(),
            transform = self.transform.name(),
            "TCP relay started"
        );

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_session(stream, peer, permit),
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                    Err(e) => return Err(e),
                },
                _ = shutdown.recv() => {
                    tracing::info!(
                        active_sessions = self.tracker.active_count(),
                        "Shutdown signal received, no longer accepting"
                    );
                    break;
                }
            }
        }

        Ok(())
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY on client stream");
        }

        let guard = self.tracker.track(peer);
        let (reader, writer) = stream.into_split();
        let session = ClientSession::new(
            peer,
            reader,
            writer,
            Arc::clone(&self.remote),
            Arc::clone(&self.transform),
            self.settings.clone(),
        );

        let span = tracing::info_span!("client", peer = %peer, session_id = %guard.id());
        tokio::spawn(
            async move {
                let _permit = permit;
                let _guard = guard;
                session.run().await;
            }
            .instrument(span),
        );
    }
}

//! Per-client session state machine.
//!
//! # States
//! ```text
//! AwaitClientData → SendToRemote → AwaitRemoteResponse → SendToClient
//!        ▲                                                     │
//!        └─────────────────────────────────────────────────────┘
//!
//! Any state → Terminated
//! ```
//!
//! # Locking
//! The shared remote lock is taken once at start-up to confirm a backend
//! connection exists, then once per round trip. A round trip holds the lock
//! from the backend write until the response has been written to the
//! client, so no two sessions interleave their exchanges.
//!
//! # Timeouts
//! - Client idle: nothing to forward yet; loop and keep waiting
//! - Backend response: abandon the round trip; after
//!   `max_consecutive_timeouts` in a row the shared connection is torn down

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::ProxyConfig;
use crate::observability::logging::hex_dump;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::remote::{RemoteConnectionManager, SharedRemote};
use crate::relay::transform::ResponseTransform;
use crate::resilience::timeouts::{read_with_timeout, ReadOutcome};

/// Communication buffer size for both directions.
pub const BUFFER_SIZE: usize = 4096;

/// Where a session currently is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitClientData,
    SendToRemote,
    AwaitRemoteResponse,
    SendToClient,
    Terminated,
}

/// Why a session ended.
#[derive(Debug)]
pub enum Termination {
    /// The initial backend connection could not be established.
    NoRemoteConnection(RelayError),
    /// The client closed its side.
    ClientClosed,
    /// The backend closed the shared connection mid round trip.
    RemoteClosed,
    /// An I/O failure or timeout streak.
    Failed(RelayError),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::NoRemoteConnection(e) => write!(f, "no remote connection ({})", e),
            Termination::ClientClosed => write!(f, "no data from client"),
            Termination::RemoteClosed => write!(f, "remote server closed the connection"),
            Termination::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Per-session tunables, derived from `ProxyConfig`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub client_idle_timeout: Duration,
    pub server_timeout: Duration,
    pub max_consecutive_timeouts: u32,
    pub buffer_size: usize,
}

impl SessionSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            client_idle_timeout: config.timeouts.client_idle(),
            server_timeout: config.timeouts.server_response(),
            max_consecutive_timeouts: config.remote.max_consecutive_timeouts,
            buffer_size: BUFFER_SIZE,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&ProxyConfig::default())
    }
}

/// Result of one pass through the critical section.
enum RoundTrip {
    Delivered,
    /// Backend did not answer in time; wait for the next client request.
    Abandoned,
}

/// One accepted client connection.
///
/// Dropping the session closes the client's write handle and logs the
/// termination reason, whichever way the session ends.
pub struct ClientSession<R, W> {
    peer: SocketAddr,
    reader: R,
    writer: W,
    remote: SharedRemote,
    transform: Arc<dyn ResponseTransform>,
    settings: SessionSettings,
    consecutive_timeouts: u32,
    phase: SessionPhase,
    reason: String,
}

impl<R, W> ClientSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(
        peer: SocketAddr,
        reader: R,
        writer: W,
        remote: SharedRemote,
        transform: Arc<dyn ResponseTransform>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            peer,
            reader,
            writer,
            remote,
            transform,
            settings,
            consecutive_timeouts: 0,
            phase: SessionPhase::AwaitClientData,
            reason: "unknown".to_string(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Drive the session to completion and report why it ended.
    pub async fn run(mut self) -> Termination {
        tracing::info!("New client connection");
        let termination = self.drive().await;
        self.phase = SessionPhase::Terminated;
        self.reason = termination.to_string();
        termination
    }

    async fn drive(&mut self) -> Termination {
        {
            let mut remote = self.remote.lock().await;
            if let Err(e) = remote.acquire().await {
                return Termination::NoRemoteConnection(e);
            }
        }

        let mut request = vec![0u8; self.settings.buffer_size];
        let mut response = vec![0u8; self.settings.buffer_size];

        loop {
            self.enter(SessionPhase::AwaitClientData);
            let outcome =
                read_with_timeout(&mut self.reader, &mut request, self.settings.client_idle_timeout).await;
            let len = match outcome {
                ReadOutcome::Data(len) => len,
                ReadOutcome::TimedOut => {
                    tracing::debug!("Timeout receiving from client");
                    continue;
                }
                ReadOutcome::Closed => {
                    tracing::debug!("No data received from client");
                    return Termination::ClientClosed;
                }
                ReadOutcome::Failed(e) => {
                    let err = RelayError::ClientRead(e);
                    tracing::error!(error = %err, "Client read failed");
                    return Termination::Failed(err);
                }
            };

            let data = &request[..len];
            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!("Received {} bytes from client:\n{}", len, hex_dump(data));
            }

            match self.round_trip(data, &mut response).await {
                Ok(RoundTrip::Delivered) => {}
                Ok(RoundTrip::Abandoned) => {
                    tracing::debug!(
                        consecutive_timeouts = self.consecutive_timeouts,
                        "Round trip abandoned, waiting for next request"
                    );
                }
                Err(termination) => return termination,
            }
        }
    }

    /// The critical section: backend write, backend read, client write.
    async fn round_trip(&mut self, request: &[u8], buf: &mut [u8]) -> Result<RoundTrip, Termination> {
        let shared = Arc::clone(&self.remote);
        let mut remote = shared.lock().await;

        self.enter(SessionPhase::SendToRemote);
        if let Err(e) = remote.send(request).await {
            return Err(abort(&mut remote, e).await);
        }
        tracing::debug!("Sent {} bytes to remote server", request.len());

        self.enter(SessionPhase::AwaitRemoteResponse);
        let outcome = match remote.receive(buf, self.settings.server_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(abort(&mut remote, e).await),
        };
        let len = match outcome {
            ReadOutcome::Data(len) => len,
            ReadOutcome::Closed => {
                remote.release("remote server closed the connection").await;
                return Err(Termination::RemoteClosed);
            }
            ReadOutcome::TimedOut => return self.on_remote_timeout(&mut remote, request).await,
            ReadOutcome::Failed(e) => {
                return Err(abort(&mut remote, RelayError::RemoteRead(e)).await);
            }
        };
        self.consecutive_timeouts = 0;

        let mut response = buf[..len].to_vec();
        self.transform.apply(&mut response);
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                transform = self.transform.name(),
                "Received {} bytes from remote server:\n{}",
                len,
                hex_dump(&response)
            );
        }

        self.enter(SessionPhase::SendToClient);
        if let Err(e) = self.writer.write_all(&response).await {
            // Local to this client; the shared connection is fine.
            let err = RelayError::ClientWrite(e);
            tracing::error!(error = %err, "Client write failed");
            return Err(Termination::Failed(err));
        }
        tracing::debug!("Sent {} bytes to client", response.len());
        metrics::record_round_trip(request.len(), response.len());

        Ok(RoundTrip::Delivered)
    }

    async fn on_remote_timeout(
        &mut self,
        remote: &mut RemoteConnectionManager,
        request: &[u8],
    ) -> Result<RoundTrip, Termination> {
        self.consecutive_timeouts += 1;
        metrics::record_remote_timeout();

        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                consecutive = self.consecutive_timeouts,
                "No response from remote server for client request:\n{}",
                hex_dump(request)
            );
        }

        if self.consecutive_timeouts >= self.settings.max_consecutive_timeouts {
            return Err(abort(remote, RelayError::RemoteTimeouts(self.consecutive_timeouts)).await);
        }
        Ok(RoundTrip::Abandoned)
    }

    fn enter(&mut self, phase: SessionPhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "Session phase");
        self.phase = phase;
    }
}

/// Log `err`, tear down the shared connection if the error implicates it,
/// and turn it into a termination.
async fn abort(remote: &mut RemoteConnectionManager, err: RelayError) -> Termination {
    tracing::error!(error = %err, "Round trip failed");
    if err.poisons_remote() {
        remote.release(&err.to_string()).await;
    }
    Termination::Failed(err)
}

impl<R, W> Drop for ClientSession<R, W> {
    fn drop(&mut self) {
        // `writer` is dropped right after this, closing the client's write side.
        tracing::info!(peer = %self.peer, reason = %self.reason, "Closing client connection");
    }
}

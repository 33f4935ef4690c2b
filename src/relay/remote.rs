//! The single shared backend connection.
//!
//! # Responsibilities
//! - Lazily open the one outbound connection on first demand
//! - Hand the live connection to whichever session holds the lock
//! - Tear it down on request so the next caller reconnects
//!
//! # Design Decisions
//! - The manager does no locking of its own. Every operation takes
//!   `&mut self`, so callers can only reach it through the `SharedRemote`
//!   mutex guard, and must keep that guard for a whole round trip
//! - Connect failures are returned, never retried here

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::resilience::timeouts::{connect_with_timeout, read_with_timeout, ReadOutcome};

/// The manager behind the exclusive lock, shared by every session.
pub type SharedRemote = Arc<Mutex<RemoteConnectionManager>>;

/// Read and write handles to the backend socket.
#[derive(Debug)]
pub struct RemoteConnection {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl RemoteConnection {
    fn new(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self { reader, writer }
    }

    /// Forward a client request verbatim.
    pub async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await
    }

    /// Wait at most `wait` for the backend to answer.
    pub async fn read_with_timeout(&mut self, buf: &mut [u8], wait: Duration) -> ReadOutcome {
        read_with_timeout(&mut self.reader, buf, wait).await
    }
}

/// Owner of the at-most-one backend connection.
#[derive(Debug)]
pub struct RemoteConnectionManager {
    address: String,
    connect_timeout: Duration,
    current: Option<RemoteConnection>,
    connections_opened: u64,
}

impl RemoteConnectionManager {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
            current: None,
            connections_opened: 0,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(config.remote.address(), config.timeouts.connect())
    }

    /// Wrap the manager in the lock every session goes through.
    pub fn into_shared(self) -> SharedRemote {
        Arc::new(Mutex::new(self))
    }

    /// Return the live connection, opening one first if there is none.
    ///
    /// A failed connect is logged and returned; the manager stays empty so the
    /// next call tries again.
    pub async fn acquire(&mut self) -> Result<&mut RemoteConnection, RelayError> {
        let connection = match self.current.take() {
            Some(connection) => connection,
            None => self.connect().await?,
        };
        Ok(self.current.insert(connection))
    }

    /// Acquire the connection and forward `data` on it.
    pub async fn send(&mut self, data: &[u8]) -> Result<(), RelayError> {
        let connection = self.acquire().await?;
        connection.write_all(data).await.map_err(RelayError::RemoteWrite)
    }

    /// Acquire the connection and wait at most `wait` for a response.
    pub async fn receive(&mut self, buf: &mut [u8], wait: Duration) -> Result<ReadOutcome, RelayError> {
        let connection = self.acquire().await?;
        Ok(connection.read_with_timeout(buf, wait).await)
    }

    /// Close the current connection, if any. The next `acquire` reconnects.
    pub async fn release(&mut self, reason: &str) {
        match self.current.take() {
            Some(mut connection) => {
                tracing::warn!(
                    remote = %self.address,
                    reason,
                    "Closing remote server connection"
                );
                // Read half is dropped with `connection`; this sends FIN first.
                let _ = connection.writer.shutdown().await;
                metrics::record_remote_teardown();
            }
            None => {
                tracing::debug!(reason, "No remote server connection to close");
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.current.is_some()
    }

    /// How many backend connections have been established so far.
    pub fn connections_opened(&self) -> u64 {
        self.connections_opened
    }

    async fn connect(&mut self) -> Result<RemoteConnection, RelayError> {
        match connect_with_timeout(&self.address, self.connect_timeout).await {
            Ok(stream) => {
                if let Err(e) = stream.set_nodelay(true) {
                    tracing::debug!(error = %e, "Failed to set TCP_NODELAY on remote stream");
                }
                self.connections_opened += 1;
                metrics::record_remote_connect(true);
                tracing::info!(
                    remote = %self.address,
                    connection = self.connections_opened,
                    "Connected to remote server"
                );
                Ok(RemoteConnection::new(stream))
            }
            Err(source) => {
                metrics::record_remote_connect(false);
                let err = RelayError::BackendConnect {
                    address: self.address.clone(),
                    source,
                };
                tracing::error!(error = %err, "Remote server unavailable");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn backend() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn acquire_reuses_live_connection() {
        let (listener, addr) = backend().await;
        let mut manager = RemoteConnectionManager::new(addr, Duration::from_secs(1));
        assert!(!manager.is_connected());

        manager.acquire().await.unwrap();
        manager.acquire().await.unwrap();

        assert!(manager.is_connected());
        assert_eq!(manager.connections_opened(), 1);
        drop(listener);
    }

    #[tokio::test]
    async fn release_forces_reconnect() {
        let (listener, addr) = backend().await;
        let mut manager = RemoteConnectionManager::new(addr, Duration::from_secs(1));

        manager.acquire().await.unwrap();
        let (mut first, _) = listener.accept().await.unwrap();

        manager.release("test teardown").await;
        assert!(!manager.is_connected());

        // The old socket sees EOF once released.
        let mut buf = [0u8; 8];
        assert_eq!(first.read(&mut buf).await.unwrap(), 0);

        manager.acquire().await.unwrap();
        assert_eq!(manager.connections_opened(), 2);
    }

    #[tokio::test]
    async fn refused_connect_leaves_manager_empty() {
        let (listener, addr) = backend().await;
        drop(listener);

        let mut manager = RemoteConnectionManager::new(addr.clone(), Duration::from_secs(1));
        match manager.acquire().await {
            Err(RelayError::BackendConnect { address, .. }) => assert_eq!(address, addr),
            other => panic!("expected connect failure, got {:?}", other.map(|_| ())),
        }
        assert!(!manager.is_connected());
        assert_eq!(manager.connections_opened(), 0);
    }

    #[tokio::test]
    async fn release_without_connection_is_noop() {
        let mut manager = RemoteConnectionManager::new("127.0.0.1:1", Duration::from_secs(1));
        manager.release("nothing to do").await;
        assert!(!manager.is_connected());
    }
}

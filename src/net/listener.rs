//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured port on all interfaces
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address. Fatal for the process.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    /// Failed to accept connection. Usually transient.
    #[error("Failed to accept: {0}")]
    Accept(#[source] std::io::Error),
    /// The connection limiter was closed underneath the listener.
    #[error("Connection limiter closed")]
    LimiterClosed,
}

/// A bounded TCP listener that limits concurrent sessions.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections wait in the kernel backlog until a slot becomes available.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind to the configured port with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let address = config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;

        Ok(Self::from_tcp(listener, config.max_connections))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(listener: TcpListener, max_connections: usize) -> Self {
        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }

        Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        }
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the session's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ListenerError::LimiterClosed)?;

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

/// A permit representing a session slot.
///
/// When dropped, the slot is released back to the listener, even if the
/// session task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permit_held_per_accepted_connection() {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listener = Listener::from_tcp(tcp, 2);
        let addr = listener.local_addr().unwrap();

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let taken = TcpListener::bind("0.0.0.0:0").await.unwrap();
        let config = ListenerConfig {
            port: taken.local_addr().unwrap().port(),
            max_connections: 1,
        };

        match Listener::bind(&config).await {
            Err(ListenerError::Bind { address, .. }) => {
                assert_eq!(address, config.bind_address());
            }
            other => panic!("expected bind error, got {:?}", other.map(|_| ())),
        }
    }
}

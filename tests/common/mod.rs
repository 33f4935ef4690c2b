//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tcp_relay::config::ProxyConfig;
use tcp_relay::net::listener::Listener;
use tcp_relay::relay::{ProxyServer, SharedRemote};
use tcp_relay::Shutdown;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock backend saw, in order, across all its connections.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    Accepted(usize),
    Received(usize, Vec<u8>),
    Replied(usize, Vec<u8>),
    Closed(usize),
}

/// How the mock backend answers one request.
pub enum Reply {
    Echo,
    Fixed(Vec<u8>),
    Silent,
    Hangup,
}

pub struct MockBackend {
    pub addr: SocketAddr,
    events: Arc<Mutex<Vec<BackendEvent>>>,
    accepts: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of connections the backend has accepted.
    pub fn accepts(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

/// Start a programmable backend on an ephemeral port.
///
/// Each request is answered after `delay` according to `respond`.
pub async fn start_programmable_backend<F>(delay: Duration, respond: F) -> MockBackend
where
    F: Fn(&[u8]) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let accepts = Arc::new(AtomicUsize::new(0));
    let respond = Arc::new(respond);

    let backend_events = events.clone();
    let backend_accepts = accepts.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let conn = backend_accepts.fetch_add(1, Ordering::SeqCst) + 1;
            let events = backend_events.clone();
            let respond = respond.clone();
            events.lock().unwrap().push(BackendEvent::Accepted(conn));

            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    let request = buf[..n].to_vec();
                    events.lock().unwrap().push(BackendEvent::Received(conn, request.clone()));
                    tokio::time::sleep(delay).await;

                    let reply = match respond(&request) {
                        Reply::Echo => request,
                        Reply::Fixed(bytes) => bytes,
                        Reply::Silent => continue,
                        Reply::Hangup => break,
                    };
                    if socket.write_all(&reply).await.is_err() {
                        break;
                    }
                    events.lock().unwrap().push(BackendEvent::Replied(conn, reply));
                }
                events.lock().unwrap().push(BackendEvent::Closed(conn));
            });
        }
    });

    MockBackend { addr, events, accepts }
}

/// A relay running in the background of a test.
pub struct Relay {
    pub addr: SocketAddr,
    pub remote: SharedRemote,
    pub shutdown: Shutdown,
}

/// Start a relay on an ephemeral port pointed at `backend`.
pub async fn start_relay<F>(backend: SocketAddr, tweak: F) -> Relay
where
    F: FnOnce(&mut ProxyConfig),
{
    start_custom_relay(backend, tweak, |server| server).await
}

/// Like `start_relay`, with a hook to customize the server before it runs.
pub async fn start_custom_relay<F, C>(backend: SocketAddr, tweak: F, customize: C) -> Relay
where
    F: FnOnce(&mut ProxyConfig),
    C: FnOnce(ProxyServer) -> ProxyServer,
{
    let mut config = ProxyConfig::default();
    config.remote.host = backend.ip().to_string();
    config.remote.port = backend.port();
    config.timeouts.connect_secs = 1.0;
    config.timeouts.server_response_secs = 1.0;
    tweak(&mut config);

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, config.listener.max_connections);

    let server = customize(ProxyServer::new(config));
    let remote = server.remote();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Relay { addr, remote, shutdown }
}

/// Send `request` and read exactly `expected_len` bytes back.
pub async fn exchange(client: &mut TcpStream, request: &[u8], expected_len: usize) -> Vec<u8> {
    client.write_all(request).await.unwrap();
    let mut reply = vec![0u8; expected_len];
    tokio::time::timeout(Duration::from_secs(3), client.read_exact(&mut reply))
        .await
        .expect("relay did not answer in time")
        .unwrap();
    reply
}

/// Wait until the relay closes `client`, failing after `within`.
pub async fn expect_closed(client: &mut TcpStream, within: Duration) {
    let mut buf = [0u8; 64];
    let read = tokio::time::timeout(within, client.read(&mut buf))
        .await
        .expect("relay kept the client open");
    // A reset is as good as an orderly close here.
    if let Ok(n) = read {
        assert_eq!(n, 0, "expected EOF, got {} bytes", n);
    }
}

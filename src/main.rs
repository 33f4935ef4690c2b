//! tcp-relay
//!
//! Accepts any number of TCP clients and relays their requests, one round
//! trip at a time, over a single shared connection to one backend server.
//!
//! # Architecture Overview
//!
//! ```text
//!   client A ──┐
//!   client B ──┼─▶ net::listener ─▶ relay::session (one task per client)
//!   client C ──┘                          │
//!                                         │ lock SharedRemote
//!                                         ▼
//!                                  relay::remote ══ one TCP conn ══▶ backend
//!                                         │
//!                                         ▼
//!   client ◀──── relay::transform (swap trailing bytes)
//!
//!   cross-cutting: config · observability · resilience · lifecycle
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use tcp_relay::config::cli::Cli;
use tcp_relay::lifecycle::{signals, Shutdown};
use tcp_relay::observability::{logging, metrics};
use tcp_relay::ProxyServer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tcp-relay: invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!("tcp-relay v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        remote = %config.remote.address(),
        server_timeout_secs = config.timeouts.server_response_secs,
        client_idle_secs = config.timeouts.client_idle_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let drain_timeout = Duration::from_secs(config.lifecycle.drain_timeout_secs);
    let server = ProxyServer::new(config);
    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Critical error: cannot start TCP relay");
            return Err(e.into());
        }
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    let tracker = server.tracker();
    server.run(listener, server_shutdown).await?;
    shutdown.drain(&tracker, drain_timeout).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

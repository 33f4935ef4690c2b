//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Inbound listener settings.
    pub listener: ListenerConfig,

    /// The single backend every session is funneled to.
    pub remote: RemoteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Port to listen on. The relay always binds all interfaces.
    pub port: u16,

    /// Maximum concurrent client sessions (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// Socket address the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 8899,
            max_connections: 10_000,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Backend host name or IP address.
    pub host: String,

    /// Backend port.
    pub port: u16,

    /// Consecutive response timeouts a session tolerates before the shared
    /// connection is torn down.
    pub max_consecutive_timeouts: u32,
}

impl RemoteConfig {
    /// `host:port` string handed to the connector.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "192.168.177.202".to_string(),
            port: 8899,
            max_consecutive_timeouts: 5,
        }
    }
}

/// Timeout configuration, in (possibly fractional) seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout.
    pub connect_secs: f64,

    /// How long a round trip waits for the backend to answer.
    pub server_response_secs: f64,

    /// How long a session waits for the next client request before
    /// looping again.
    pub client_idle_secs: f64,
}

impl TimeoutConfig {
    pub fn connect(&self) -> Duration {
        Duration::from_secs_f64(self.connect_secs)
    }

    pub fn server_response(&self) -> Duration {
        Duration::from_secs_f64(self.server_response_secs)
    }

    pub fn client_idle(&self) -> Duration {
        Duration::from_secs_f64(self.client_idle_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5.0,
            server_response_secs: 0.15,
            client_idle_secs: 60.0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error, or the classic
    /// NOTSET/DEBUG/INFO/WARNING/ERROR/CRITICAL names).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// How long to wait for active sessions after a shutdown signal.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 5,
        }
    }
}

//! Command-line flags.
//!
//! Flags override values from the optional TOML file, which in turn override
//! the built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::ProxyConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "tcp-relay")]
#[command(about = "TCP relay funneling every client through one shared backend connection", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Proxy server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Backend host
    #[arg(long)]
    pub server_host: Option<String>,

    /// Backend port
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Seconds to wait for a backend response
    #[arg(long)]
    pub server_timeout: Option<f64>,

    /// Seconds to wait for the next client request
    #[arg(long)]
    pub client_timeout: Option<f64>,

    /// Seconds to wait when connecting to the backend
    #[arg(long)]
    pub connect_timeout: Option<f64>,

    /// Log level: NOTSET, DEBUG, INFO, WARNING, ERROR, CRITICAL
    #[arg(long)]
    pub loglevel: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_address: Option<String>,
}

impl Cli {
    /// Layer the flags over `base`.
    pub fn apply(&self, mut base: ProxyConfig) -> ProxyConfig {
        if let Some(port) = self.port {
            base.listener.port = port;
        }
        if let Some(host) = &self.server_host {
            base.remote.host = host.clone();
        }
        if let Some(port) = self.server_port {
            base.remote.port = port;
        }
        if let Some(secs) = self.server_timeout {
            base.timeouts.server_response_secs = secs;
        }
        if let Some(secs) = self.client_timeout {
            base.timeouts.client_idle_secs = secs;
        }
        if let Some(secs) = self.connect_timeout {
            base.timeouts.connect_secs = secs;
        }
        if let Some(level) = &self.loglevel {
            base.observability.log_level = level.clone();
        }
        if let Some(addr) = &self.metrics_address {
            base.observability.metrics_enabled = true;
            base.observability.metrics_address = addr.clone();
        }
        base
    }

    /// Build the final, validated configuration.
    pub fn resolve(&self) -> Result<ProxyConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        let config = self.apply(base);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

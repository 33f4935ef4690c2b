//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Reject log levels the subscriber cannot parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::observability::logging::normalize_level;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be zero")]
    ZeroPort { field: &'static str },

    #[error("remote.host must not be empty")]
    EmptyHost,

    #[error("{field} must be a positive number of seconds (got {value})")]
    InvalidTimeout { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("unknown log level '{0}'")]
    UnknownLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::ZeroPort { field: "listener.port" });
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroLimit { field: "listener.max_connections" });
    }

    if config.remote.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }
    if config.remote.port == 0 {
        errors.push(ValidationError::ZeroPort { field: "remote.port" });
    }
    if config.remote.max_consecutive_timeouts == 0 {
        errors.push(ValidationError::ZeroLimit { field: "remote.max_consecutive_timeouts" });
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.server_response_secs", config.timeouts.server_response_secs),
        ("timeouts.client_idle_secs", config.timeouts.client_idle_secs),
    ];
    for (field, value) in timeouts {
        // Must be representable as a Duration: rejects NaN, infinities and
        // anything past u64::MAX seconds.
        if value <= 0.0 || Duration::try_from_secs_f64(value).is_err() {
            errors.push(ValidationError::InvalidTimeout { field, value });
        }
    }

    if normalize_level(&config.observability.log_level).is_none() {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

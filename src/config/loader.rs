//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML document into a configuration. Missing keys take defaults.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Read a TOML file without validating it, so command-line overrides can be
/// layered on top before the final check.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = parse_config(
            r#"
            [remote]
            host = "10.0.0.7"

            [timeouts]
            server_response_secs = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.remote.address(), "10.0.0.7:8899");
        assert_eq!(config.timeouts.server_response_secs, 0.5);
        assert_eq!(config.timeouts.client_idle_secs, 60.0);
        assert_eq!(config.listener.port, 8899);
    }

    #[test]
    fn sample_config_matches_defaults() {
        let config = parse_config(include_str!("../../relay.example.toml")).unwrap();
        let defaults = ProxyConfig::default();

        assert_eq!(config.remote.address(), defaults.remote.address());
        assert_eq!(config.listener.port, defaults.listener.port);
        assert_eq!(config.timeouts.server_response_secs, defaults.timeouts.server_response_secs);
        assert_eq!(config.lifecycle.drain_timeout_secs, defaults.lifecycle.drain_timeout_secs);
    }

    #[test]
    fn malformed_document_is_a_parse_error() {
        let err = parse_config("[remote\nhost = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config(Path::new("/nonexistent/tcp-relay.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}

use crate::cli::Cli;
use std::time::Duration;
use thiserror::Error;

/// Endpoint used when none is given on the command line.
pub const DEFAULT_ENDPOINT: &str = ":9000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("listen endpoint must not be empty")]
    EmptyEndpoint,
    #[error("idle timeout must be greater than zero")]
    ZeroIdleTimeout,
}

/// Runtime configuration for the update controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on, in `host:port` form
    pub endpoint: String,
    /// Disconnect modules that stay silent this long. None disables the check.
    pub idle_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: normalize_endpoint(DEFAULT_ENDPOINT),
            idle_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn new(endpoint: &str, idle_timeout_secs: Option<u64>) -> Result<Self, ConfigError> {
        if endpoint.trim().is_empty() {
            return Err(ConfigError::EmptyEndpoint);
        }

        let idle_timeout = match idle_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroIdleTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            endpoint: normalize_endpoint(endpoint),
            idle_timeout,
        })
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::new(&cli.endpoint, cli.idle_timeout)
    }
}

/// Expands the port-only form `:PORT` to listen on all interfaces.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    match endpoint.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => endpoint.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

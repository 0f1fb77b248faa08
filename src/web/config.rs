//! Metrics endpoint configuration.

use crate::error::{Result, UpsError};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the metrics endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address to bind the endpoint to
    pub host: String,
    /// Port to bind the endpoint to
    pub port: u16,
    /// Path serving the Prometheus exposition
    pub metrics_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            metrics_path: "/metrics".to_string(),
        }
    }
}

impl WebConfig {
    /// Create a new endpoint configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = path.into();
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parse and check the bind address and metrics path.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        if !self.metrics_path.starts_with('/') || self.metrics_path.len() < 2 {
            return Err(UpsError::config_error(format!(
                "metrics path must start with '/' and not be the root: {}",
                self.metrics_path
            )));
        }
        self.bind_address()
            .parse::<SocketAddr>()
            .map_err(|e| UpsError::config_error(format!("Invalid bind address: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WebConfig::default();
        assert_eq!(config.bind_address(), format!("0.0.0.0:{}", crate::DEFAULT_WEB_PORT));
        assert!(config.socket_addr().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        assert!(WebConfig::new("not a host", 9099).socket_addr().is_err());
        assert!(WebConfig::default().with_metrics_path("/").socket_addr().is_err());
        assert!(WebConfig::default().with_metrics_path("metrics").socket_addr().is_err());
    }
}

//! Error handling for the UPS monitoring agent.

use std::time::Duration;

/// A specialized `Result` type for agent operations.
pub type Result<T> = std::result::Result<T, UpsError>;

/// The main error type for the UPS monitoring agent.
#[derive(Debug, thiserror::Error)]
pub enum UpsError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The status-query tool could not reach the device
    #[error("UPS {target} unreachable: {reason}")]
    Unreachable { target: String, reason: String },

    /// The status-query tool did not answer in time
    #[error("UPS {target} did not answer within {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    /// A numeric variable could not be parsed
    #[error("Failed to parse {0}")]
    Parse(String),

    /// Metric registration or encoding failed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl UpsError {
    /// Create a new unreachable error for `target`
    pub fn unreachable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unreachable {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new metrics error
    pub fn metrics_error(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error is a per-cycle poll failure that the scheduler
    /// recovers from by marking the device offline.
    pub fn is_poll_failure(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::Io(_)
        )
    }
}

impl From<prometheus::Error> for UpsError {
    fn from(err: prometheus::Error) -> Self {
        Self::Metrics(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_failures_are_recoverable() {
        assert!(UpsError::unreachable("ups@localhost", "exit status 1").is_poll_failure());
        assert!(UpsError::Timeout {
            target: "ups@localhost".to_string(),
            timeout: Duration::from_secs(10),
        }
        .is_poll_failure());
        assert!(!UpsError::web_server_error("bind").is_poll_failure());
        assert!(!UpsError::parse_error("battery.charge").is_poll_failure());
    }

    #[test]
    fn test_error_display() {
        let err = UpsError::unreachable("ups@nas", "empty output");
        assert_eq!(err.to_string(), "UPS ups@nas unreachable: empty output");
    }
}

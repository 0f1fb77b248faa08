//! Status polling through the external `upsc`-style query tool.

use crate::error::{Result, UpsError};
use crate::monitor::data::VariableSnapshot;
use crate::monitor::traits::StatusSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Default status-query command.
pub const DEFAULT_COMMAND: &str = "upsc";

/// Configuration for the status poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Status-query binary
    pub command: String,
    /// Device identifier registered with the UPS daemon
    pub device: String,
    /// Host running the UPS daemon
    pub host: String,
    /// Upper bound for a single query
    pub timeout: Duration,
    /// Log the raw query output
    pub debug: bool,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            device: crate::DEFAULT_DEVICE.to_string(),
            host: crate::DEFAULT_UPS_HOST.to_string(),
            timeout: Duration::from_secs(crate::DEFAULT_TIMEOUT_SECS),
            debug: false,
        }
    }
}

impl PollerConfig {
    pub fn new(device: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            host: host.into(),
            ..Default::default()
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// `<device>@<host>` address passed to the query tool.
    pub fn target(&self) -> String {
        format!("{}@{}", self.device, self.host)
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            return Err(UpsError::config_error("status command must not be empty"));
        }
        if self.device.trim().is_empty() || self.host.trim().is_empty() {
            return Err(UpsError::config_error("device and host must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(UpsError::config_error("query timeout must be positive"));
        }
        Ok(())
    }
}

/// Polls a UPS by running the status-query command.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    config: PollerConfig,
}

impl StatusPoller {
    pub fn new(config: PollerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    async fn run_query(&self) -> Result<String> {
        let target = self.config.target();
        let child = Command::new(&self.config.command)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let reason = format!("failed to run {}: {}", self.config.command, e);
                UpsError::unreachable(&target, reason)
            })?;

        let waited = tokio::time::timeout(self.config.timeout, child.wait_with_output()).await;
        let output = match waited {
            Ok(output) => output?,
            Err(_) => {
                return Err(UpsError::Timeout {
                    target,
                    timeout: self.config.timeout,
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpsError::unreachable(
                target,
                format!("{} ({})", output.status, stderr.trim()),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(UpsError::unreachable(target, "empty output"));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl StatusSource for StatusPoller {
    async fn poll(&self) -> Result<VariableSnapshot> {
        let raw = self.run_query().await?;
        if self.config.debug {
            debug!(target_ups = %self.config.target(), "Raw status output:\n{}", raw);
        }
        Ok(parse_variables(&raw))
    }

    fn target(&self) -> String {
        self.config.target()
    }
}

/// Parse `key: value` lines; anything else is skipped.
pub fn parse_variables(output: &str) -> VariableSnapshot {
    output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPSC_OUTPUT: &str = "\
battery.charge: 100
battery.runtime: 2430
battery.voltage: 13.5
device.mfr: CPS
device.model: CP1500EPFCLCD
input.voltage: 232.0
ups.status: OL
Init SSL without certificate database
driver.parameter.pollinterval: 15
ups.firmware: CR01802B
";

    #[test]
    fn test_parse_variables() {
        let vars = parse_variables(UPSC_OUTPUT);
        assert_eq!(vars.get("battery.charge"), Some("100"));
        assert_eq!(vars.get("input.voltage"), Some("232.0"));
        assert_eq!(vars.get("ups.status"), Some("OL"));
        assert_eq!(vars.get("device.model"), Some("CP1500EPFCLCD"));
        assert_eq!(vars.len(), 9);
    }

    #[test]
    fn test_parse_keeps_colons_in_values() {
        let vars = parse_variables("ups.date: 2024:01:02\n: orphan\nno delimiter here\n");
        assert_eq!(vars.get("ups.date"), Some("2024:01:02"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(PollerConfig::default().validate().is_ok());
        assert!(PollerConfig::new("", "localhost").validate().is_err());
        assert!(PollerConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert_eq!(PollerConfig::new("rack", "nas").target(), "rack@nas");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_poll_reads_command_output() {
        // `echo` prints its argument, which parses as a single variable
        let config = PollerConfig::new("ups.status: OL", "x").with_command("echo");
        let poller = StatusPoller::new(config).unwrap();
        let vars = poller.poll().await.unwrap();
        assert_eq!(vars.get("ups.status"), Some("OL@x"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_unreachable() {
        let poller = StatusPoller::new(PollerConfig::default().with_command("false")).unwrap();
        let err = poller.poll().await.unwrap_err();
        assert!(matches!(err, UpsError::Unreachable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_output_is_unreachable() {
        let poller = StatusPoller::new(PollerConfig::default().with_command("true")).unwrap();
        let err = poller.poll().await.unwrap_err();
        assert!(matches!(err, UpsError::Unreachable { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_query_times_out() {
        // `sh <device>@<host>` runs the script written at that path
        let script = std::env::temp_dir().join(format!("ups-watch-slow-{}", std::process::id()));
        let device = script.to_string_lossy().into_owned();
        let script_path = format!("{}@x", device);
        std::fs::write(&script_path, "sleep 5\n").unwrap();

        let config = PollerConfig::new(device, "x")
            .with_command("sh")
            .with_timeout(Duration::from_millis(300));
        let poller = StatusPoller::new(config).unwrap();

        let started = std::time::Instant::now();
        let err = poller.poll().await.unwrap_err();
        let elapsed = started.elapsed();
        let _ = std::fs::remove_file(&script_path);

        assert!(matches!(err, UpsError::Timeout { .. }), "got {:?}", err);
        assert!(err.is_poll_failure());
        assert!(elapsed < Duration::from_secs(3), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_missing_command_is_unreachable() {
        let poller = StatusPoller::new(
            PollerConfig::default().with_command("definitely-not-a-ups-query-tool"),
        )
        .unwrap();
        let err = poller.poll().await.unwrap_err();
        assert!(err.is_poll_failure());
    }
}

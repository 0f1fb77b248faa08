//! # UPS Watch - UPS power-state monitoring agent
//!
//! Polls a UPS through a NUT-style status-query tool (`upsc`) on a fixed
//! interval, tracks power-state transitions and outage accounting, and
//! exposes the results on a Prometheus scrape endpoint.
//!
//! ## Features
//!
//! - **Status polling**: runs `upsc <device>@<host>` with a bounded timeout
//! - **Outage tracking**: on-battery / low-battery detection, outage count,
//!   last outage duration and cumulative battery time
//! - **Pull-based metrics**: `/metrics` in the Prometheus text format
//! - **Library + Binary**: use as a crate or standalone agent
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ups_watch::{
//!     start_web_server, MetricsRegistry, PollerConfig, Scheduler, StateTracker, StatusPoller,
//!     WebConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(MetricsRegistry::new()?);
//!     let poller = StatusPoller::new(PollerConfig::new("ups", "localhost"))?;
//!     let scheduler = Scheduler::new(
//!         poller,
//!         StateTracker::default(),
//!         registry.clone(),
//!         Duration::from_secs(30),
//!     );
//!
//!     let (_stop, stop_rx) = tokio::sync::watch::channel(false);
//!     tokio::spawn(scheduler.run(stop_rx));
//!
//!     start_web_server(WebConfig::default(), registry).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod exporter;
pub mod monitor;
pub mod web;

// Re-export public API
pub use error::{Result, UpsError};
pub use exporter::MetricsRegistry;
pub use monitor::{
    data::{DeviceInfo, MetricsSnapshot, Readings, Timestamp, VariableSnapshot},
    poller::{parse_variables, PollerConfig, StatusPoller},
    scheduler::{unix_now, Scheduler},
    tokens::{StatusTokens, TokenSet},
    tracker::{MonitorState, StateTracker},
    traits::StatusSource,
};
pub use web::{bind_listener, serve, start_web_server, WebConfig};

/// The default device identifier
pub const DEFAULT_DEVICE: &str = "ups";

/// The default host running the UPS daemon
pub const DEFAULT_UPS_HOST: &str = "localhost";

/// The default poll interval in seconds
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// The default status-query timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The default metrics endpoint port
pub const DEFAULT_WEB_PORT: u16 = 9099;

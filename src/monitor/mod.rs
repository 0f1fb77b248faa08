//! UPS polling, state tracking and scheduling.
//!
//! This module provides the monitoring pipeline: a [`StatusSource`] yields
//! raw variables, the [`StateTracker`] turns them into power-state
//! transitions and metrics, and the [`Scheduler`] drives both on a fixed
//! interval.

pub mod data;
pub mod poller;
pub mod scheduler;
pub mod tokens;
pub mod tracker;
pub mod traits;

// Re-export commonly used items
pub use data::{MetricsSnapshot, VariableSnapshot};
pub use poller::{PollerConfig, StatusPoller};
pub use scheduler::Scheduler;
pub use tokens::StatusTokens;
pub use tracker::{MonitorState, StateTracker};
pub use traits::StatusSource;

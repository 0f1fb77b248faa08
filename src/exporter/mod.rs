//! Prometheus exposition of the latest UPS metrics.

pub mod registry;

pub use registry::{MetricsRegistry, METRICS_NAMESPACE};

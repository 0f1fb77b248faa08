//! Traits for UPS status sources.

use crate::error::Result;
use crate::monitor::data::VariableSnapshot;
use async_trait::async_trait;

/// A source of raw UPS status variables.
///
/// Implementations should return [`UpsError::Unreachable`] or
/// [`UpsError::Timeout`] when the device cannot be queried; the
/// scheduler treats those as a recoverable, per-cycle failure.
///
/// [`UpsError::Unreachable`]: crate::error::UpsError::Unreachable
/// [`UpsError::Timeout`]: crate::error::UpsError::Timeout
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Query the device once.
    async fn poll(&self) -> Result<VariableSnapshot>;

    /// Human-readable address of the device, for logs.
    fn target(&self) -> String;
}

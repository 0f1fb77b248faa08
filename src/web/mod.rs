//! HTTP endpoint serving the UPS metrics.
//!
//! Scrapes only read what the poll loop last stored in the
//! [`MetricsRegistry`]; they never trigger a poll.

pub mod config;
pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;

use crate::error::{Result, UpsError};
use crate::exporter::MetricsRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Bind the endpoint's listener. Failure here is fatal for the agent.
pub async fn bind_listener(config: &WebConfig) -> Result<TcpListener> {
    let addr = config.socket_addr()?;
    TcpListener::bind(addr)
        .await
        .map_err(|e| UpsError::web_server_error(format!("Failed to bind to {}: {}", addr, e)))
}

/// Serve the endpoint on `listener` until `shutdown` flips to true.
pub async fn serve(
    listener: TcpListener,
    config: WebConfig,
    registry: Arc<MetricsRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = create_app(&config, registry);

    if let Ok(addr) = listener.local_addr() {
        info!("Metrics available at http://{}{}", addr, config.metrics_path);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // A dropped sender also ends the wait
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(|e| UpsError::web_server_error(format!("Server error: {}", e)))
}

/// Bind and serve the endpoint until the process exits.
pub async fn start_web_server(config: WebConfig, registry: Arc<MetricsRegistry>) -> Result<()> {
    let listener = bind_listener(&config).await?;
    let (_tx, rx) = watch::channel(false);
    serve(listener, config, registry, rx).await
}

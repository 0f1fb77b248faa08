//! HTTP handlers for the metrics endpoint.

use crate::exporter::MetricsRegistry;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared handler state.
pub type AppState = Arc<MetricsRegistry>;

/// Prometheus text exposition of the latest snapshot.
pub async fn metrics(State(registry): State<AppState>) -> Response {
    match registry.render() {
        Ok(body) => ([(header::CONTENT_TYPE, registry.content_type())], body).into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Latest snapshot as JSON; 404 until the first poll cycle completes.
pub async fn get_snapshot(State(registry): State<AppState>) -> Response {
    match registry.latest() {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no poll cycle has completed yet" })),
        )
            .into_response(),
    }
}

/// Health check endpoint.
pub async fn health_check(State(registry): State<AppState>) -> Json<serde_json::Value> {
    let latest = registry.latest();
    Json(json!({
        "status": "ok",
        "service": "ups-watch",
        "version": env!("CARGO_PKG_VERSION"),
        "ups_online": latest.as_ref().map(|s| s.online),
        "last_poll": latest.as_ref().map(|s| s.timestamp),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Minimal landing page pointing at the exposition.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>UPS Watch</title></head>
<body>
<h1>UPS Watch</h1>
<ul>
<li><a href="/metrics">Metrics</a></li>
<li><a href="/api/snapshot">Latest snapshot</a></li>
<li><a href="/api/health">Health</a></li>
</ul>
</body>
</html>
"#;

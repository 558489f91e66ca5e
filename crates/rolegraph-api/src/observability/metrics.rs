//! Prometheus exporter wiring for the `metrics` facade.
//!
//! Metrics are recorded through the `metrics` facade and exposed with
//! `metrics-exporter-prometheus`.
//!
//! # Metrics Exposed
//!
//! - `rolegraph_http_requests_total` - HTTP requests by method, path, status class
//! - `rolegraph_http_request_duration_seconds` - HTTP request duration histogram
//! - `rolegraph_dispatch_total` - Dispatched commands by kind and status
//! - `rolegraph_dispatch_duration_seconds` - Command dispatch duration histogram

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Handle to the installed recorder, shared with the scrape route.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Current snapshot in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Failure to install the global recorder.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the global Prometheus recorder and describes the application metrics.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    register_default_metrics();

    Ok(MetricsState::new(handle))
}

fn register_default_metrics() {
    metrics::describe_counter!(
        "rolegraph_http_requests_total",
        "Total number of HTTP requests"
    );
    metrics::describe_histogram!(
        "rolegraph_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    rolegraph_domain::register_dispatch_metrics();
}

/// Content type Prometheus scrapers expect.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the metrics endpoint.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

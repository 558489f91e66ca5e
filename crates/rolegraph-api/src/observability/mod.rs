//! Observability infrastructure for rolegraph.
//!
//! This module provides:
//! - Structured logging configuration (pretty text or JSON)
//! - The Prometheus recorder and `/metrics` endpoint

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, parse_log_level, LoggingConfig};
pub use metrics::{init_metrics, metrics_handler, MetricsError, MetricsState};

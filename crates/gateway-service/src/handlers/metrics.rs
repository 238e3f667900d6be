//! Prometheus metrics endpoint handler.
//!
//! # Security
//!
//! The default rule table makes `/metrics` public so Prometheus can scrape
//! it. Labels are bounded and carry no subjects, claims or tokens.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// Returns Prometheus-formatted metrics for scraping.
#[tracing::instrument(skip_all, name = "gateway.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

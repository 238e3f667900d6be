//! Metrics definitions for the gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: the known routes plus `/other`
//! - `status`: 3 values (success, error, timeout)
//! - `result`: token rejection kinds plus `success`
//! - `decision`: allow, unauthenticated, forbidden

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization adds a cache lookup to every request; most
        // requests should finish well under 50ms.
        .set_buckets_for_metric(
            Matcher::Prefix("gateway_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `gateway_http_requests_total`, `gateway_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including gateway rejections and fallback 404s.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gateway_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gateway_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/me" => "/api/me",
        _ => {
            for (area, label) in [
                ("/api/public", "/api/public"),
                ("/api/user", "/api/user"),
                ("/api/admin", "/api/admin"),
            ] {
                if path == area || path.starts_with(&format!("{area}/")) {
                    return label;
                }
            }
            "/other"
        }
    }
}

// ============================================================================
// Authentication and Authorization Metrics
// ============================================================================

/// Record the outcome of a token validation.
///
/// Metric: `gateway_token_validations_total`
/// Labels: `result` (`success` or a rejection kind)
pub fn record_token_validation(result: &'static str) {
    counter!("gateway_token_validations_total", "result" => result).increment(1);
}

/// Record an authorization decision.
///
/// Metric: `gateway_authz_decisions_total`
/// Labels: `decision`
pub fn record_authz_decision(decision: &'static str) {
    counter!("gateway_authz_decisions_total", "decision" => decision).increment(1);
}

/// Record a JWKS refresh.
///
/// Metric: `gateway_jwks_refresh_total`
/// Labels: `status` (success, error)
pub fn record_jwks_refresh(status: &'static str) {
    counter!("gateway_jwks_refresh_total", "status" => status).increment(1);
}

// ============================================================================
// Tests
// ============================================================================

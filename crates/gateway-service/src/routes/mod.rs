//! HTTP routes for the gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::jwks::JwksClient;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{authorize, http_metrics_middleware};
use crate::services::Gateway;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Signing key cache, shared with the gateway's validator.
    pub jwks_client: Arc<JwksClient>,

    /// Authorization gateway.
    pub gateway: Arc<Gateway>,
}

impl AppState {
    /// Wire the key cache and gateway from configuration.
    pub fn from_config(config: Config) -> Self {
        let jwks_client = Arc::new(JwksClient::new(
            config.jwks_url.clone(),
            Duration::from_secs(config.jwks_cache_ttl_seconds),
            Duration::from_millis(config.jwks_fetch_timeout_ms),
        ));
        let gateway = Arc::new(Gateway::from_config(&config, Arc::clone(&jwks_client)));

        Self {
            config,
            jwks_client,
            gateway,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Liveness and readiness probes
/// - `/metrics` - Prometheus metrics
/// - `/api/public`, `/api/user`, `/api/admin`, `/api/me` - Example API
/// - A 404 fallback
///
/// Every route, the fallback included, sits behind the authorization
/// middleware, so what is public is decided by the rule table alone.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/public", get(handlers::public_endpoint))
        .route("/api/user", get(handlers::user_endpoint))
        .route("/api/admin", get(handlers::admin_endpoint))
        .route("/api/me", get(handlers::get_me))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (bottom-to-top execution):
    // 1. authorize - Gateway decision (innermost, wraps routes and fallback)
    // 2. TraceLayer - Log request details, including rejections
    // 3. TimeoutLayer - Bound the whole request, JWKS refresh included
    // 4. http_metrics_middleware - Record every response (outermost)
    app_routes
        .merge(metrics_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.gateway),
            authorize,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_config_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Config>();
    }
}

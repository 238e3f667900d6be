//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use crate::mock_issuer::{MockIssuer, TEST_AUDIENCE};
use gateway_service::config::Config;
use gateway_service::observability::metrics::init_metrics_recorder;
use gateway_service::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Process-wide metrics handle.
///
/// Only one global recorder can be installed; later servers in the same
/// test binary share it so `/metrics` reflects real traffic.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let issuer = MockIssuer::start(&[]).await;
///     let server = TestGatewayServer::spawn(&issuer).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a gateway trusting `issuer`, with default rules.
    pub async fn spawn(issuer: &MockIssuer) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(issuer, HashMap::new()).await
    }

    /// Spawn a gateway trusting `issuer`, with extra configuration.
    ///
    /// Entries in `overrides` replace the harness defaults.
    pub async fn spawn_with_vars(
        issuer: &MockIssuer,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_URL".to_string(), issuer.jwks_url()),
            ("JWT_ISSUER".to_string(), issuer.issuer()),
            ("JWT_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("JWKS_FETCH_TIMEOUT_MS".to_string(), "2000".to_string()),
        ]);
        vars.extend(overrides);

        Self::spawn_with_config(
            Config::from_vars(&vars)
                .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?,
        )
        .await
    }

    /// Spawn a gateway from a prepared configuration.
    async fn spawn_with_config(config: Config) -> Result<Self, anyhow::Error> {
        let state = Arc::new(AppState::from_config(config));
        let app = routes::build_routes(state, metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Get the base URL for making HTTP requests.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        // Abort the server task when the test server is dropped
        self._handle.abort();
    }
}

//! HTTP metrics middleware.
//!
//! Applied as the outermost layer so that gateway rejections (401/403),
//! timeouts and fallback 404s are recorded alongside handler responses.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration for
/// every response.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_403() -> (StatusCode, &'static str) {
        (StatusCode::FORBIDDEN, "Forbidden")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/api/public", get(handler_200))
            .route("/api/admin", get(handler_403))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn status_of(app: Router, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        app.oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_passes_responses_through() {
        assert_eq!(status_of(test_app(), "/api/public").await, StatusCode::OK);
        assert_eq!(status_of(test_app(), "/api/admin").await, StatusCode::FORBIDDEN);
        assert_eq!(status_of(test_app(), "/nonexistent").await, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_middleware_records_status_codes() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                status_of(test_app(), "/api/admin").await;
                status_of(test_app(), "/nonexistent").await;
            });
        });

        let counters: Vec<(String, String, u64)> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter_map(|(key, _, _, value)| {
                let key = key.key().clone();
                match value {
                    DebugValue::Counter(v) if key.name() == "gateway_http_requests_total" => {
                        let get = |name: &str| {
                            key.labels()
                                .find(|l| l.key() == name)
                                .map(|l| l.value().to_string())
                                .unwrap_or_default()
                        };
                        Some((get("endpoint"), get("status_code"), v))
                    }
                    _ => None,
                }
            })
            .collect();

        assert!(counters.contains(&("/api/admin".to_string(), "403".to_string(), 1)));
        assert!(counters.contains(&("/other".to_string(), "404".to_string(), 1)));
    }
}

//! Gateway error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic: a 401 never
//! says why the token was rejected. Actual reasons are logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const AUTH_REALM: &str = "authz-gateway";

/// HTTP-facing gateway error.
///
/// Maps to:
/// - Unauthenticated: 401 Unauthorized (with a Bearer challenge)
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No usable credentials. `token_rejected` is set when a bearer token
    /// was presented but failed validation.
    #[error("Authentication required")]
    Unauthenticated { token_rejected: bool },

    #[error("Access denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthenticated { .. } => 401,
            GatewayError::Forbidden => 403,
            GatewayError::NotFound(_) => 404,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::Unauthenticated { .. } => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Authentication is required to access this resource".to_string(),
            ),
            GatewayError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "You do not have permission to access this resource".to_string(),
            ),
            GatewayError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response();

        if let GatewayError::Unauthenticated { token_rejected } = self {
            let challenge = if token_rejected {
                format!("Bearer realm=\"{}\", error=\"invalid_token\"", AUTH_REALM)
            } else {
                format!("Bearer realm=\"{}\"", AUTH_REALM)
            };
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    // Helper function to read the response body as JSON
    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display_messages_are_generic() {
        assert_eq!(
            GatewayError::Unauthenticated {
                token_rejected: true
            }
            .to_string(),
            "Authentication required"
        );
        assert_eq!(GatewayError::Forbidden.to_string(), "Access denied");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GatewayError::Unauthenticated {
                token_rejected: false
            }
            .status_code(),
            401
        );
        assert_eq!(GatewayError::Forbidden.status_code(), 403);
        assert_eq!(GatewayError::NotFound("x".to_string()).status_code(), 404);
    }

    #[tokio::test]
    async fn test_into_response_unauthenticated_without_token() {
        let response = GatewayError::Unauthenticated {
            token_rejected: false,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(www_auth, "Bearer realm=\"authz-gateway\"");

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_into_response_unauthenticated_with_rejected_token() {
        let response = GatewayError::Unauthenticated {
            token_rejected: true,
        }
        .into_response();

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer realm=\"authz-gateway\""));
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "UNAUTHENTICATED");
        assert_eq!(
            body_json["error"]["message"],
            "Authentication is required to access this resource"
        );
    }

    #[tokio::test]
    async fn test_into_response_forbidden() {
        let response = GatewayError::Forbidden.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = GatewayError::NotFound("Resource not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Resource not found");
    }
}

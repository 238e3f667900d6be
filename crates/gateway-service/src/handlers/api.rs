//! Example API handlers protected by the default rule table.

use crate::authz::Identity;
use crate::errors::GatewayError;
use crate::models::MessageResponse;
use axum::{Extension, Json};
use tracing::instrument;

/// Handler for GET /api/public
#[instrument(skip_all, name = "gateway.handlers.public")]
pub async fn public_endpoint() -> Json<MessageResponse> {
    Json(MessageResponse::new("Public endpoint: OK"))
}

/// Handler for GET /api/user
///
/// Greets the caller by subject.
#[instrument(skip_all, name = "gateway.handlers.user")]
pub async fn user_endpoint(identity: Option<Extension<Identity>>) -> Json<MessageResponse> {
    let name = identity
        .as_ref()
        .map_or("unknown", |Extension(identity)| identity.subject.as_str());

    Json(MessageResponse::new(format!("User endpoint: Hello {}", name)))
}

/// Handler for GET /api/admin
#[instrument(skip_all, name = "gateway.handlers.admin")]
pub async fn admin_endpoint() -> Json<MessageResponse> {
    Json(MessageResponse::new("Admin endpoint: Top secret"))
}

/// Fallback for unknown routes the rule table let through.
pub async fn not_found() -> GatewayError {
    GatewayError::NotFound("Resource not found".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_public_endpoint() {
        let Json(body) = public_endpoint().await;
        assert_eq!(body.message, "Public endpoint: OK");
    }

    #[tokio::test]
    async fn test_user_endpoint_greets_subject() {
        let identity = Identity {
            subject: "alice".to_string(),
            authorities: ["ROLE_USER".to_string()].into_iter().collect(),
        };

        let Json(body) = user_endpoint(Some(Extension(identity))).await;
        assert_eq!(body.message, "User endpoint: Hello alice");
    }

    #[tokio::test]
    async fn test_user_endpoint_without_identity() {
        let Json(body) = user_endpoint(None).await;
        assert_eq!(body.message, "User endpoint: Hello unknown");
    }

    #[tokio::test]
    async fn test_admin_endpoint() {
        let Json(body) = admin_endpoint().await;
        assert_eq!(body.message, "Admin endpoint: Top secret");
    }

    #[tokio::test]
    async fn test_not_found() {
        assert_eq!(not_found().await.status_code(), 404);
    }
}

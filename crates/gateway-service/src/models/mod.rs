//! Response models for the gateway's own endpoints.

use serde::Serialize;

/// Body of the example API handlers.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Caller details returned by `/api/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Token subject.
    pub subject: String,

    /// Canonical authorities, sorted.
    pub authorities: Vec<String>,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Whether the issuer's signing keys are loaded.
    pub jwks: &'static str,

    /// Generic error message when not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

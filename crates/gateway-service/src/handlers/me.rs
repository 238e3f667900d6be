//! Current caller handler.
//!
//! Returns the subject and authorities the gateway derived from the token.

use crate::errors::GatewayError;
use crate::middleware::IdentityExt;
use crate::models::MeResponse;
use axum::extract::Request;
use axum::Json;
use tracing::instrument;

/// Handler for GET /api/me
///
/// Reached only with a valid token under the default rule table. Without an
/// identity (a table configured to make `/api/me` public) it answers 401.
///
/// ## Response
///
/// ```json
/// {
///   "subject": "8f0e7c1a-...",
///   "authorities": ["ROLE_ADMIN", "ROLE_USER"]
/// }
/// ```
#[instrument(skip_all, name = "gateway.handlers.me")]
pub async fn get_me(req: Request) -> Result<Json<MeResponse>, GatewayError> {
    let identity = req.identity().ok_or(GatewayError::Unauthenticated {
        token_rejected: false,
    })?;

    tracing::debug!(target: "gateway.handlers.me", "Returning caller identity");

    Ok(Json(MeResponse {
        subject: identity.subject.clone(),
        authorities: identity.authorities.iter().map(ToString::to_string).collect(),
    }))
}

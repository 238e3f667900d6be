//! Authorization middleware.
//!
//! Runs the gateway decision for every request before routing, so handlers
//! (and the 404 fallback) only see requests the rule table allowed.

use crate::authz::{Decision, Identity};
use crate::errors::GatewayError;
use crate::services::Gateway;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// Authorization middleware.
///
/// # Response
///
/// - 401 Unauthorized with a Bearer challenge when the route needs a caller
///   and there is no valid token
/// - 403 Forbidden when the caller lacks the required authority
/// - Otherwise the request continues, with the caller's [`Identity`] in the
///   request extensions when a valid token was presented
#[instrument(skip_all, name = "gateway.middleware.gateway")]
pub async fn authorize(
    State(gateway): State<Arc<Gateway>>,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let outcome = gateway
        .decide(req.uri().path(), authorization.as_deref())
        .await;

    match outcome.decision {
        Decision::Allow(identity) => {
            if let Some(identity) = identity {
                req.extensions_mut().insert(identity);
            }
            next.run(req).await
        }
        Decision::RejectUnauthenticated => reject(GatewayError::Unauthenticated {
            token_rejected: outcome.rejection.is_some(),
        }),
        Decision::RejectForbidden => reject(GatewayError::Forbidden),
    }
}

fn reject(error: GatewayError) -> Response {
    tracing::debug!(
        target: "gateway.middleware.gateway",
        status = error.status_code(),
        "Request rejected"
    );
    error.into_response()
}

/// Extension trait for reading the caller's identity from a request.
pub trait IdentityExt {
    /// Returns `None` on routes reached without a valid token.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}

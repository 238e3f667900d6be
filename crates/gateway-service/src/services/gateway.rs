//! Gateway dispatcher.
//!
//! Combines token validation, role normalization and the rule table into a
//! single decision per request. Kept free of HTTP types so it can be driven
//! directly from tests; the axum middleware is a thin wrapper around it.

use crate::auth::jwks::JwksClient;
use crate::auth::jwt::{JwtValidator, TokenPolicy, TokenRejection};
use crate::auth::roles::RoleNormalizer;
use crate::authz::{Decision, Identity, RuleTable};
use crate::config::Config;
use crate::observability::metrics;
use std::sync::Arc;
use tracing::instrument;

/// Decision for one request, plus the reason a presented token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOutcome {
    pub decision: Decision,
    pub rejection: Option<TokenRejection>,
}

/// Request authorization gateway.
pub struct Gateway {
    validator: JwtValidator,
    normalizer: RoleNormalizer,
    rules: Arc<RuleTable>,
}

impl Gateway {
    pub fn new(validator: JwtValidator, normalizer: RoleNormalizer, rules: Arc<RuleTable>) -> Self {
        Self {
            validator,
            normalizer,
            rules,
        }
    }

    /// Wire a gateway from configuration and a shared key cache.
    pub fn from_config(config: &Config, jwks_client: Arc<JwksClient>) -> Self {
        let normalizer = RoleNormalizer::from_config(config);
        let rules = Arc::new(RuleTable::new(
            config.rules.clone(),
            config.default_requirement.clone(),
            &normalizer,
        ));
        let validator = JwtValidator::new(jwks_client, TokenPolicy::from_config(config));

        Self::new(validator, normalizer, rules)
    }

    /// Decide a request from its path and raw `Authorization` header.
    ///
    /// A token that fails validation does not short-circuit: the request is
    /// evaluated as unauthenticated, so public routes still succeed.
    #[instrument(skip_all, name = "gateway.decide", fields(path = %path))]
    pub async fn decide(&self, path: &str, authorization: Option<&str>) -> GatewayOutcome {
        let mut rejection = None;

        let identity = match extract_bearer_token(authorization) {
            None => None,
            Some(token) => match self.validator.validate(token).await {
                Ok(claims) => Some(Identity {
                    authorities: self.normalizer.normalize(&claims),
                    subject: claims.sub,
                }),
                Err(reason) => {
                    tracing::debug!(
                        target: "gateway.middleware.gateway",
                        reason = reason.as_label(),
                        "Token rejected, continuing unauthenticated"
                    );
                    rejection = Some(reason);
                    None
                }
            },
        };

        let decision = self.rules.evaluate(path, identity);
        metrics::record_authz_decision(decision.as_label());

        GatewayOutcome {
            decision,
            rejection,
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The `Bearer` scheme is matched case-insensitively. Other schemes and
/// empty tokens yield `None`.
pub fn extract_bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

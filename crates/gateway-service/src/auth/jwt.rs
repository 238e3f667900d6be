//! Access token validation.
//!
//! Validates bearer tokens against the issuer's published key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The verification algorithm is pinned by the key, never by the token;
//!   a header naming any other algorithm (including `none` and HMAC) is rejected
//! - `exp`, `iss`, `aud` and `sub` are required
//! - `iat` in the future beyond the clock skew is rejected
//! - Rejection reasons are logged at debug level only; callers get a kind

use crate::auth::claims::ValidatedClaims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::config::Config;
use crate::observability::metrics;
use common::jwt::{decode_ed25519_public_key_jwk, extract_header, validate_iat, TokenHeader};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("No access token was presented")]
    MissingToken,

    #[error("The access token is malformed")]
    MalformedToken,

    #[error("The access token signature could not be verified")]
    BadSignature,

    #[error("The access token is expired or not yet valid")]
    Expired,

    #[error("The access token was issued by an untrusted issuer")]
    IssuerMismatch,

    #[error("The access token is not intended for this service")]
    AudienceMismatch,
}

impl TokenRejection {
    /// Label used for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TokenRejection::MissingToken => "missing_token",
            TokenRejection::MalformedToken => "malformed_token",
            TokenRejection::BadSignature => "bad_signature",
            TokenRejection::Expired => "expired",
            TokenRejection::IssuerMismatch => "issuer_mismatch",
            TokenRejection::AudienceMismatch => "audience_mismatch",
        }
    }
}

/// What a token must satisfy besides a valid signature.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    /// Expected `iss`.
    pub issuer: String,

    /// Accepted `aud` values.
    pub audiences: Vec<String>,

    /// Tolerance in seconds for `exp` and `nbf`.
    pub leeway_seconds: u64,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,
}

impl TokenPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            issuer: config.jwt_issuer.clone(),
            audiences: config.jwt_audiences.clone(),
            leeway_seconds: config.jwt_leeway_seconds,
            clock_skew: Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs()),
        }
    }
}

/// Token validator backed by the JWKS cache.
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    policy: TokenPolicy,
}

impl JwtValidator {
    pub fn new(jwks_client: Arc<JwksClient>, policy: TokenPolicy) -> Self {
        Self {
            jwks_client,
            policy,
        }
    }

    /// Validate a token and return its claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Read `kid` and `alg` from the header
    /// 3. Look up the key, refreshing the key set at most once
    /// 4. Verify the signature with the key's pinned algorithm
    /// 5. Validate `exp`/`nbf` with leeway, then `iss`, `aud`, `sub`
    /// 6. Validate `iat` with clock skew tolerance
    ///
    /// # Errors
    ///
    /// Returns the `TokenRejection` kind for the first failed check.
    #[instrument(skip_all, name = "gateway.auth.jwt.validate")]
    pub async fn validate(&self, token: &str) -> Result<ValidatedClaims, TokenRejection> {
        let result = self.validate_inner(token).await;
        metrics::record_token_validation(match &result {
            Ok(_) => "success",
            Err(rejection) => rejection.as_label(),
        });
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<ValidatedClaims, TokenRejection> {
        if token.trim().is_empty() {
            return Err(TokenRejection::MissingToken);
        }

        let header = extract_header(token).map_err(|e| {
            tracing::debug!(target: "gateway.auth.jwt", error = ?e, "Token header extraction failed");
            TokenRejection::MalformedToken
        })?;

        let jwk = self.jwks_client.get_key(&header.kid).await.map_err(|e| {
            tracing::debug!(target: "gateway.auth.jwt", kid = %header.kid, error = ?e, "No verification key for token");
            TokenRejection::BadSignature
        })?;

        let claims = verify_token(token, &header, &jwk, &self.policy)?;

        if let Some(iat) = claims.iat {
            if let Err(e) = validate_iat(iat, self.policy.clock_skew) {
                tracing::debug!(target: "gateway.auth.jwt", error = ?e, "Token iat validation failed");
                return Err(TokenRejection::Expired);
            }
        }

        tracing::debug!(target: "gateway.auth.jwt", "Token validated successfully");
        Ok(claims)
    }
}

/// Verify the signature and registered claims of a token.
fn verify_token(
    token: &str,
    header: &TokenHeader,
    jwk: &Jwk,
    policy: &TokenPolicy,
) -> Result<ValidatedClaims, TokenRejection> {
    let (decoding_key, algorithm) = key_material(jwk)?;

    if header.alg.parse::<Algorithm>().ok() != Some(algorithm) {
        tracing::debug!(
            target: "gateway.auth.jwt",
            header_alg = %header.alg,
            key_alg = ?algorithm,
            "Token algorithm does not match key"
        );
        return Err(TokenRejection::BadSignature);
    }

    let mut validation = Validation::new(algorithm);
    validation.leeway = policy.leeway_seconds;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_issuer(&[&policy.issuer]);
    validation.set_audience(policy.audiences.as_slice());
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let token_data =
        decode::<Map<String, Value>>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "gateway.auth.jwt", error = %e, "Token verification failed");
            rejection_for(e.kind())
        })?;

    ValidatedClaims::from_payload(token_data.claims).map_err(|e| {
        tracing::debug!(target: "gateway.auth.jwt", claim = e.0, "Token claim has unexpected type");
        TokenRejection::MalformedToken
    })
}

/// Build a decoding key from a JWK and pick the one algorithm it verifies.
fn key_material(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), TokenRejection> {
    let reject = |reason: &str| {
        tracing::warn!(target: "gateway.auth.jwt", kid = %jwk.kid, kty = %jwk.kty, reason, "Unusable JWK");
        TokenRejection::BadSignature
    };

    match jwk.kty.as_str() {
        "OKP" => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                return Err(reject("unsupported curve"));
            }
            if jwk.alg.as_deref().is_some_and(|alg| alg != "EdDSA") {
                return Err(reject("algorithm does not match key type"));
            }
            let x = jwk.x.as_deref().ok_or_else(|| reject("missing x"))?;
            let public_key = decode_ed25519_public_key_jwk(x).map_err(|_| reject("invalid x encoding"))?;
            Ok((DecodingKey::from_ed_der(&public_key), Algorithm::EdDSA))
        }
        "RSA" => {
            let algorithm = match jwk.alg.as_deref().unwrap_or("RS256") {
                "RS256" => Algorithm::RS256,
                "RS384" => Algorithm::RS384,
                "RS512" => Algorithm::RS512,
                "PS256" => Algorithm::PS256,
                "PS384" => Algorithm::PS384,
                "PS512" => Algorithm::PS512,
                _ => return Err(reject("algorithm does not match key type")),
            };
            let n = jwk.n.as_deref().ok_or_else(|| reject("missing n"))?;
            let e = jwk.e.as_deref().ok_or_else(|| reject("missing e"))?;
            let key = DecodingKey::from_rsa_components(n, e).map_err(|_| reject("invalid modulus or exponent"))?;
            Ok((key, algorithm))
        }
        "EC" => {
            let algorithm = match jwk.crv.as_deref() {
                Some("P-256") => Algorithm::ES256,
                Some("P-384") => Algorithm::ES384,
                _ => return Err(reject("unsupported curve")),
            };
            if jwk
                .alg
                .as_deref()
                .is_some_and(|alg| alg.parse::<Algorithm>().ok() != Some(algorithm))
            {
                return Err(reject("algorithm does not match curve"));
            }
            let x = jwk.x.as_deref().ok_or_else(|| reject("missing x"))?;
            let y = jwk.y.as_deref().ok_or_else(|| reject("missing y"))?;
            let key = DecodingKey::from_ec_components(x, y).map_err(|_| reject("invalid coordinates"))?;
            Ok((key, algorithm))
        }
        _ => Err(reject("unsupported key type")),
    }
}

fn rejection_for(kind: &ErrorKind) -> TokenRejection {
    match kind {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenRejection::Expired,
        ErrorKind::InvalidIssuer => TokenRejection::IssuerMismatch,
        ErrorKind::InvalidAudience => TokenRejection::AudienceMismatch,
        ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
            "iss" => TokenRejection::IssuerMismatch,
            "aud" => TokenRejection::AudienceMismatch,
            _ => TokenRejection::MalformedToken,
        },
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::Crypto(_) => TokenRejection::BadSignature,
        _ => TokenRejection::MalformedToken,
    }
}

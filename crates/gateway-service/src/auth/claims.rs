//! Claims of a verified token.
//!
//! Identity providers put roles in provider-specific places, so the full
//! payload is kept as a JSON map next to the typed registered claims. The
//! `sub` field is redacted in Debug output to prevent exposure in logs.

use serde_json::{Map, Value};
use std::fmt;

/// Claims from a token that passed signature and registered-claim checks.
#[derive(Clone)]
pub struct ValidatedClaims {
    /// Subject - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp, when present.
    pub iat: Option<i64>,

    /// Full payload, including the registered claims above.
    claims: Map<String, Value>,
}

/// A required registered claim is absent or has the wrong type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingClaim(pub &'static str);

/// Custom Debug implementation that redacts the `sub` field and omits the
/// payload, which may carry personal data.
impl fmt::Debug for ValidatedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("claim_count", &self.claims.len())
            .finish()
    }
}

impl ValidatedClaims {
    /// Build claims from a verified payload.
    ///
    /// # Errors
    ///
    /// Returns `MissingClaim` if `sub` is not a non-empty string or `exp` is
    /// not an integer. A non-integer `iat` is treated the same way.
    pub fn from_payload(claims: Map<String, Value>) -> Result<Self, MissingClaim> {
        let sub = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(MissingClaim("sub"))?
            .to_string();

        let exp = claims
            .get("exp")
            .and_then(Value::as_i64)
            .ok_or(MissingClaim("exp"))?;

        let iat = match claims.get("iat") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().ok_or(MissingClaim("iat"))?),
        };

        Ok(Self {
            sub,
            exp,
            iat,
            claims,
        })
    }

    /// Get a top-level claim.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Follow a path of nested object keys, e.g. `["realm_access", "roles"]`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.claims.get(first.as_ref())?, |value, key| {
            value.as_object()?.get(key.as_ref())
        })
    }
}

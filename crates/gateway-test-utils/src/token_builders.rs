//! Builder patterns for test token claims
//!
//! Claims are shaped like an OpenID Connect access token with realm and
//! client roles, the layout the gateway's role normalizer reads by default.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new("https://idp.test/realms/demo", "account")
///     .for_subject("alice")
///     .with_realm_roles(&["user"])
///     .expires_in(3600)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestClaimsBuilder {
    claims: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Create a builder with a subject, one-hour expiry and `iat` of now.
    pub fn new(issuer: &str, audience: &str) -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("iss".to_string(), json!(issuer));
        claims.insert("aud".to_string(), json!(audience));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        Self { claims }
    }

    /// Set the subject
    pub fn for_subject(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set the audience (string or list)
    pub fn with_audience(self, audience: Value) -> Self {
        self.with_claim("aud", audience)
    }

    /// Set `realm_access.roles`
    pub fn with_realm_roles(self, roles: &[&str]) -> Self {
        self.with_claim("realm_access", json!({ "roles": roles }))
    }

    /// Set `resource_access.<client>.roles`
    pub fn with_client_roles(self, client: &str, roles: &[&str]) -> Self {
        self.with_claim("resource_access", json!({ client: { "roles": roles } }))
    }

    /// Set expiration in seconds from now (negative for an expired token)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim(
            "exp",
            json!((Utc::now() + Duration::seconds(seconds)).timestamp()),
        )
    }

    /// Set issued-at as seconds from now
    pub fn issued_in(self, seconds: i64) -> Self {
        self.with_claim(
            "iat",
            json!((Utc::now() + Duration::seconds(seconds)).timestamp()),
        )
    }

    /// Set not-before as seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim(
            "nbf",
            json!((Utc::now() + Duration::seconds(seconds)).timestamp()),
        )
    }

    /// Set any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }
}

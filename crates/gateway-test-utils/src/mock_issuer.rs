//! Mock identity provider for E2E testing
//!
//! Serves a JWKS document from a wiremock server and hands out claims
//! builders pre-filled with the matching issuer and audience.

use crate::crypto_fixtures::TestKeypair;
use crate::token_builders::TestClaimsBuilder;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock serves its key set on.
pub const JWKS_PATH: &str = "/realms/test/protocol/openid-connect/certs";

/// Audience every token from [`MockIssuer::claims`] carries.
pub const TEST_AUDIENCE: &str = "account";

/// A running mock issuer.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let issuer = MockIssuer::start(&[&keypair]).await;
/// let token = keypair.sign_token(&issuer.claims().build());
/// ```
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Start a mock issuer publishing the given keys.
    pub async fn start(keys: &[&TestKeypair]) -> Self {
        let server = MockServer::start().await;
        let issuer = Self { server };
        issuer.publish(keys).await;
        issuer
    }

    /// Start a mock issuer whose key endpoint always answers 500.
    pub async fn failing() -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Start a mock issuer that publishes `keys` only after `delay`.
    pub async fn hanging(keys: &[&TestKeypair], delay: Duration) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_document(keys))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        Self { server }
    }

    /// Replace the published key set.
    ///
    /// Earlier mounts are dropped, so the next fetch sees only `keys`.
    /// The recorded request count is reset as well.
    pub async fn publish(&self, keys: &[&TestKeypair]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.server)
            .await;
    }

    /// URL of the key set endpoint.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Issuer identifier tokens must carry.
    pub fn issuer(&self) -> String {
        format!("{}/realms/test", self.server.uri())
    }

    /// Claims builder with this issuer and the test audience.
    pub fn claims(&self) -> TestClaimsBuilder {
        TestClaimsBuilder::new(&self.issuer(), TEST_AUDIENCE)
    }

    /// Number of key set requests served so far.
    pub async fn jwks_request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Build a JWKS document from keypairs.
pub fn jwks_document(keys: &[&TestKeypair]) -> Value {
    json!({
        "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>()
    })
}

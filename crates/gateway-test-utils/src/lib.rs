//! # Gateway Test Utilities
//!
//! Shared test utilities for the authorization gateway.
//!
//! This crate provides:
//! - Deterministic signing keys (`TestKeypair`)
//! - Token claim builders (`TestClaimsBuilder`)
//! - A mocked identity provider serving JWKS (`MockIssuer`)
//! - Server test harness (`TestGatewayServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gateway_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let keypair = TestKeypair::new(1, "test-key-01");
//!     let issuer = MockIssuer::start(&[&keypair]).await;
//!     let server = TestGatewayServer::spawn(&issuer).await?;
//!
//!     let token = keypair.sign_token(&issuer.claims().with_realm_roles(&["user"]).build());
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/user", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_issuer;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_issuer::*;
pub use server_harness::*;
pub use token_builders::*;

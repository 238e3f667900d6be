//! Token authentication.
//!
//! # Components
//!
//! - `jwks` - Signing key cache backed by the issuer's JWKS endpoint
//! - `jwt` - Token validation
//! - `claims` - Claims of a verified token
//! - `roles` - Role normalization into canonical authorities

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod roles;

pub use claims::ValidatedClaims;
pub use jwks::{JwksClient, KeyCacheError};
pub use jwt::{JwtValidator, TokenPolicy, TokenRejection};
pub use roles::{AuthoritySet, RoleNormalizer};

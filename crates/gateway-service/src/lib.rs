//! Authorization gateway service library.
//!
//! An HTTP gateway that authenticates bearer tokens from an external
//! identity provider and authorizes each request against an ordered table
//! of path rules before it reaches a handler.
//!
//! # Request flow
//!
//! ```text
//! middleware::authorize -> services::Gateway::decide
//!     -> auth::JwtValidator (auth::JwksClient)
//!     -> auth::RoleNormalizer
//!     -> authz::RuleTable
//! ```
//!
//! # Modules
//!
//! - `auth` - Token validation, key cache, role normalization
//! - `authz` - Path rules and decisions
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authorization and metrics middleware
//! - `models` - Response models
//! - `observability` - Metrics
//! - `routes` - Axum router setup
//! - `services` - Gateway dispatcher

pub mod auth;
pub mod authz;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;

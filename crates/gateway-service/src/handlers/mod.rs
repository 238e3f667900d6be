//! HTTP request handlers for the gateway.
//!
//! Handlers behind the gateway never make authorization decisions of their
//! own; they only read the [`Identity`](crate::authz::Identity) the
//! middleware attached.

pub mod api;
pub mod health;
pub mod me;
pub mod metrics;

pub use api::{admin_endpoint, not_found, public_endpoint, user_endpoint};
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;

//! Service layer for the gateway.
//!
//! # Components
//!
//! - `gateway` - Per-request authentication and authorization decision

pub mod gateway;

pub use gateway::{extract_bearer_token, Gateway, GatewayOutcome};

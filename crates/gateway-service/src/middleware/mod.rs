//! Middleware for the gateway.
//!
//! # Components
//!
//! - `gateway` - Authorization middleware applied to every route
//! - `http_metrics` - HTTP metrics middleware (outermost layer)

pub mod gateway;
pub mod http_metrics;

pub use gateway::{authorize, IdentityExt};
pub use http_metrics::http_metrics_middleware;

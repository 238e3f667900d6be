//! Common utilities shared across the authorization gateway crates.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (header parsing, size limits, clock skew)
pub mod jwt;

//! Shared test utilities for the message-pact crates.
//!
//! This crate provides:
//! - Proptest generators for JSON values, descriptions and whole message pacts
//! - Fixtures with the example two-message pact and document builders
//!
//! Everything is expressed as `serde_json::Value` so the engine crate can use
//! these helpers from its own tests without a dependency cycle.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;

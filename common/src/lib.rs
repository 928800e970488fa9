//! Shared library for cross-cutting concerns of the message-pact verifier.
//!
//! This crate provides centralized implementations for:
//! - Platform error type shared by configuration loading and publishing
//! - Tracing subscriber setup for hosting harnesses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod tracing_config;

pub use error::PlatformError;
pub use tracing_config::{TracingConfig, init_tracing};

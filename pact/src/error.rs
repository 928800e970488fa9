//! Error types using thiserror 2.0.
//!
//! Three families, with different blast radius:
//! - [`ParseError`]: the contract document is unusable, fatal to the whole run
//! - [`ProducerError`]: one interaction's producer failed, recorded on that
//!   interaction's result only
//! - [`PactError`]: crate-level wrapper for the file and publishing surfaces
//!
//! Matching mismatches are data ([`crate::MatchResult`]), never errors.

use pact_common::PlatformError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Contract document parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Input is not a well-formed contract document
    #[error("Malformed contract document: {0}")]
    MalformedStructure(String),

    /// Declared pact specification version is not supported
    #[error("Unsupported pact specification version: {0}")]
    UnsupportedVersion(String),

    /// A required field is absent
    #[error("Missing required field: {0}")]
    MissingRequiredField(String),

    /// Two interactions share a description, making producer binding ambiguous
    #[error("Duplicate interaction description: {0}")]
    DuplicateDescription(String),

    /// A matching rule could not be parsed
    #[error("Invalid matching rule at {path}: {reason}")]
    InvalidMatchingRule {
        /// Path expression the rule was declared under
        path: String,
        /// What is wrong with it
        reason: String,
    },
}

impl ParseError {
    /// Create a malformed structure error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedStructure(msg.into())
    }

    /// Create a missing required field error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField(field.into())
    }

    /// Create an invalid matching rule error.
    #[must_use]
    pub fn invalid_rule(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMatchingRule {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while producing the actual message for an interaction.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ProducerError {
    /// No producer is registered under the interaction description
    #[error("No producer registered for '{0}'")]
    NotFound(String),

    /// The producer returned an error
    #[error("Producer failed: {0}")]
    Failed(String),

    /// The producer panicked
    #[error("Producer panicked: {0}")]
    Panicked(String),
}

impl ProducerError {
    /// Create a producer failure.
    #[must_use]
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<anyhow::Error> for ProducerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(format!("{err:#}"))
    }
}

/// Crate-level error for file, serialization and publishing surfaces.
#[derive(Error, Debug)]
pub enum PactError {
    /// Contract document could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Contract file could not be read
    #[error("Failed to read contract file {}: {source}", .path.display())]
    Io {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Platform error (from pact-common)
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for verifier operations.
pub type PactResult<T> = Result<T, PactError>;

//! Centralized error type for the verifier's outer surfaces.
//!
//! Contract parsing and producer failures have their own error types in
//! `message-pact`; this one covers environment configuration and the broker
//! publishing seam, plus tracing setup.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External collaborator is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Create an invalid input error with the given message.
    ///
    /// # Examples
    ///
    /// ```
    /// use pact_common::PlatformError;
    ///
    /// let err = PlatformError::invalid_input("PACT_MAX_WORKERS must be a number");
    /// assert_eq!(err.to_string(), "Invalid input: PACT_MAX_WORKERS must be a number");
    /// ```
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request body could not be encoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// An access token was empty or whitespace only.
    #[error("access token is empty")]
    EmptyToken,

    /// A username was empty or whitespace only.
    #[error("username is empty")]
    EmptyUsername,
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

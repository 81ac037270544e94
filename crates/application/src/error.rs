//! Application error types

use thiserror::Error;

use crate::auth::AuthError;
use crate::ports::IdentityError;

/// Application-level errors raised by use cases.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// The authenticated session failed (refresh, transport, identity).
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The API answered with a status the use case does not accept.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// First characters of the response body
        body: String,
    },

    /// The API answered 2xx but the body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Query parameters could not be encoded.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Reading or writing local state failed.
    #[error("storage error: {0}")]
    Storage(#[from] IdentityError),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

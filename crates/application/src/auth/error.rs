//! Authentication error taxonomy.

use thiserror::Error;
use verdant_domain::DomainError;

use crate::ports::HttpClientError;

/// Errors surfaced by the authenticated session.
///
/// `Clone` so that one refresh outcome can be handed to every caller
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The sign-in endpoint rejected the email and password.
    #[error("sign-in failed with status {status}: {body}")]
    LoginFailed {
        /// HTTP status code
        status: u16,
        /// First characters of the response body
        body: String,
    },

    /// The sign-out endpoint refused to end the session.
    #[error("sign-out failed with status {status}: {body}")]
    LogoutFailed {
        /// HTTP status code
        status: u16,
        /// First characters of the response body
        body: String,
    },

    /// The refresh endpoint rejected the session (missing or expired cookie).
    #[error("token refresh failed with status {status}: {body}")]
    RefreshFailed {
        /// HTTP status code
        status: u16,
        /// First characters of the response body
        body: String,
    },

    /// The refresh endpoint answered 2xx without a usable access token.
    #[error("token refresh response did not contain an access token")]
    RefreshEmpty,

    /// The current-user endpoint answered with a non-2xx status.
    #[error("current user fetch failed with status {status}: {body}")]
    MeFetchFailed {
        /// HTTP status code
        status: u16,
        /// First characters of the response body
        body: String,
    },

    /// The current-user endpoint answered 2xx without a username.
    #[error("current user response did not contain a username")]
    MeFetchEmpty,

    /// Connectivity failure, passed through unchanged.
    #[error(transparent)]
    Transport(#[from] HttpClientError),

    /// The request body could not be encoded.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] DomainError),

    /// The refresh task ended without producing an outcome.
    #[error("token refresh aborted: {0}")]
    RefreshAborted(String),
}

impl AuthError {
    /// Returns true if the refresh session itself is unusable, meaning
    /// the user has to sign in again.
    #[must_use]
    pub const fn is_session_rejected(&self) -> bool {
        matches!(self, Self::RefreshFailed { .. } | Self::RefreshEmpty)
    }

    /// Returns true if the request was cancelled by the caller.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(HttpClientError::Cancelled))
    }
}

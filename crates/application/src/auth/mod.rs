//! Access-token lifecycle for the portal API.
//!
//! This module provides:
//! - Password sign-in and server-side sign-out
//! - An in-memory token store for the short-lived bearer token
//! - A refresh coordinator that exchanges the session cookie for a new
//!   token, collapsing concurrent refreshes into one network call
//! - The authenticated session: attaches the token to requests, and on a
//!   401 clears it, refreshes once and retries once
//! - The current-user fetcher built on the session

mod current_user;
mod endpoint;
mod error;
mod refresh;
mod session;
mod token_store;

pub use endpoint::{ApiBase, LOGIN_PATH, LOGOUT_PATH, ME_PATH, REFRESH_PATH};
pub use error::AuthError;
pub use refresh::RefreshCoordinator;
pub use session::{ApiRequest, AuthSession};
pub use token_store::{TokenStatus, TokenStore};

/// How many characters of an error body are kept in error values.
pub(crate) const ERROR_SNIPPET_CHARS: usize = 300;

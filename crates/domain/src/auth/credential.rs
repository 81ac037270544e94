//! The long-lived session credential used to mint access tokens.

use std::fmt;

use serde::Serialize;

/// Name of the HTTP-only cookie that carries the refresh session.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// How the refresh session travels with the token-refresh call.
///
/// The server owns the refresh session and sets it as an HTTP-only
/// cookie. A browser-like transport keeps it in its cookie jar
/// (`Ambient`); hosts without a shared jar pass the value explicitly.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum SessionCredential {
    /// Rely on the transport's cookie jar.
    #[default]
    Ambient,
    /// Attach this refresh cookie value to the refresh call.
    RefreshCookie(String),
}

impl SessionCredential {
    /// Returns the `Cookie` header value to send with the refresh call, if
    /// the credential is explicit.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        match self {
            Self::Ambient => None,
            Self::RefreshCookie(value) => Some(format!("{REFRESH_COOKIE_NAME}={value}")),
        }
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambient => f.write_str("Ambient"),
            Self::RefreshCookie(_) => f.write_str("RefreshCookie(<redacted>)"),
        }
    }
}

/// Email and password accepted by the portal's sign-in endpoint.
///
/// Serializes to the sign-in request body. `Debug` never shows the
/// password.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct LoginCredentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

impl LoginCredentials {
    /// Creates sign-in credentials.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

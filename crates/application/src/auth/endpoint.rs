//! API base URL and the auth endpoint paths.

/// Token refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Current-user endpoint, relative to the API base.
pub const ME_PATH: &str = "/api/auth/me/";

/// Password sign-in endpoint; the server answers by setting the refresh cookie.
pub const LOGIN_PATH: &str = "/api/auth/login/";

/// Server-side sign-out endpoint.
pub const LOGOUT_PATH: &str = "/api/auth/logout/";

/// Base URL of the remote API, without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    /// Creates a base from a URL; trailing slashes are trimmed.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self(url.trim_end_matches('/').to_string())
    }

    /// Returns the base URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves a request path against the base.
    ///
    /// Absolute `http(s)://` URLs pass through untouched.
    #[must_use]
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.0)
        } else {
            format!("{}/{path}", self.0)
        }
    }
}

//! Short-lived bearer access token.

use std::fmt;

use crate::error::{DomainError, DomainResult};

/// An opaque bearer credential used to authorize individual API calls.
///
/// The token is never printed in full: `Debug` and [`AccessToken::preview`]
/// only expose the first few characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AccessToken(String);

impl AccessToken {
    /// Creates a token from its raw value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyToken`] if the value is empty or
    /// whitespace only.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyToken);
        }
        Ok(Self(value))
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `Authorization` header value for this token.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Get a preview of the token (first 8 chars + ...).
    #[must_use]
    pub fn preview(&self) -> String {
        match self.0.char_indices().nth(8) {
            Some((cut, _)) if self.0.len() > 12 => format!("{}...", &self.0[..cut]),
            _ => "***".to_string(),
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.preview()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_blank_token() {
        assert_eq!(AccessToken::new(""), Err(DomainError::EmptyToken));
        assert_eq!(AccessToken::new("   "), Err(DomainError::EmptyToken));
    }

    #[test]
    fn authorization_header_uses_bearer_scheme() {
        let token = AccessToken::new("T1").unwrap();
        assert_eq!(token.authorization_header(), "Bearer T1");
        assert_eq!(token.as_str(), "T1");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let token = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.payload.sig").unwrap();
        let debug = format!("{token:?}");
        assert_eq!(debug, "AccessToken(\"eyJhbGci...\")");

        let short = AccessToken::new("short").unwrap();
        assert!(!format!("{short:?}").contains("short"));
    }
}

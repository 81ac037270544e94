//! User projections returned by the portal API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// The authenticated principal, as returned by `/api/auth/me/`.
///
/// Fetched fresh on every call; never cached by the auth core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Login name, never empty
    pub username: String,
    /// Contact email, if the account has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Server-side user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    /// Profile bio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Avatar image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_photo: Option<String>,
}

impl CurrentUser {
    /// Creates a user with only a username.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyUsername`] for a blank username.
    pub fn new(username: impl Into<String>) -> DomainResult<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(DomainError::EmptyUsername);
        }
        Ok(Self {
            username,
            email: None,
            id: None,
            fullname: None,
            bio: None,
            avatar_photo: None,
        })
    }

    /// Sets the email; blank values count as absent.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email.filter(|e| !e.trim().is_empty());
        self
    }
}

/// A user as listed by search and friend endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Server-side user id
    pub id: u64,
    /// Login name
    pub username: String,
    /// Given name
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name
    #[serde(default)]
    pub last_name: Option<String>,
    /// Display name, when the server provides one
    #[serde(default)]
    pub fullname: Option<String>,
}

impl UserSummary {
    /// Returns the best human-readable name for this user.
    #[must_use]
    pub fn display_name(&self) -> String {
        if let Some(full) = self.fullname.as_deref().filter(|s| !s.trim().is_empty()) {
            return full.to_string();
        }
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.trim().is_empty())
            .collect();
        if parts.is_empty() {
            self.username.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// The username persisted after a successful sign-in.
///
/// Presentational code reads this to decide logged-in/out hints; it is
/// not proof of a valid session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredIdentity {
    /// Username of the last signed-in user
    pub username: String,
    /// When the identity was written
    pub saved_at: DateTime<Utc>,
}

impl StoredIdentity {
    /// Creates an identity record for `user`, stamped `now`.
    #[must_use]
    pub fn for_user(user: &CurrentUser, now: DateTime<Utc>) -> Self {
        Self {
            username: user.username.clone(),
            saved_at: now,
        }
    }
}

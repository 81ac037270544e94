//! In-memory access token storage.
//!
//! The store holds at most one token: the current one. It lives as long
//! as its session and is never written to disk.

use std::sync::Arc;
use tokio::sync::RwLock;
use verdant_domain::AccessToken;

/// Thread-safe holder of the current access token.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl TokenStore {
    /// Create an empty token store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current token, if any. No side effects.
    pub async fn get(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    /// Overwrite the current token.
    pub async fn set(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }

    /// Remove the current token.
    pub async fn clear(&self) {
        self.token.write().await.take();
    }

    /// Remove the current token only if it is still `stale`.
    ///
    /// Returns true if the token was removed. A token written by a
    /// concurrent refresh is left in place.
    pub async fn clear_if_current(&self, stale: &AccessToken) -> bool {
        let mut token = self.token.write().await;
        if token.as_ref() == Some(stale) {
            token.take();
            true
        } else {
            false
        }
    }

    /// Get token status for display.
    pub async fn status(&self) -> TokenStatus {
        self.token
            .read()
            .await
            .as_ref()
            .map_or(TokenStatus::Absent, |token| TokenStatus::Present {
                preview: token.preview(),
            })
    }
}

/// Status of the token slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token is cached; the next request refreshes first.
    Absent,
    /// A token is cached.
    Present {
        /// Redacted preview of the token.
        preview: String,
    },
}

impl TokenStatus {
    /// Get a user-friendly display message.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Absent => "No access token".to_string(),
            Self::Present { preview } => format!("Access token {preview}"),
        }
    }
}

//! Identity repository port
//!
//! Durable storage for the username of the last signed-in user.

use async_trait::async_trait;
use verdant_domain::StoredIdentity;

/// Errors that can occur while reading or writing the stored identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No location is available for the identity file.
    #[error("no identity location available")]
    NoLocation,
}

/// Repository trait for the persisted identity.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Loads the stored identity. Returns `None` if nothing is stored.
    async fn load(&self) -> Result<Option<StoredIdentity>, IdentityError>;

    /// Replaces the stored identity.
    ///
    /// # Errors
    /// Returns an error if the identity cannot be written.
    async fn save(&self, identity: &StoredIdentity) -> Result<(), IdentityError>;

    /// Removes the stored identity. Clearing an empty store succeeds.
    ///
    /// # Errors
    /// Returns an error if the identity exists but cannot be removed.
    async fn clear(&self) -> Result<(), IdentityError>;
}

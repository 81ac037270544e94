//! File-based identity persistence.
//!
//! The last signed-in username lives in a small JSON file, by default in
//! the platform data directory:
//! - Linux: ~/.local/share/verdant/identity.json
//! - macOS: ~/Library/Application Support/verdant/identity.json
//! - Windows: %APPDATA%/verdant/identity.json

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use verdant_application::ports::{IdentityError, IdentityRepository};
use verdant_domain::StoredIdentity;

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Stores the identity as JSON at a fixed path.
///
/// Without a path every write fails with [`IdentityError::NoLocation`]
/// and reads report nothing stored.
#[derive(Debug, Clone)]
pub struct FileIdentityRepository {
    path: Option<PathBuf>,
}

impl FileIdentityRepository {
    /// Creates a repository storing the identity at `path`.
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Returns the identity file path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl IdentityRepository for FileIdentityRepository {
    async fn load(&self) -> Result<Option<StoredIdentity>, IdentityError> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let identity =
            from_json_bytes(&content).map_err(|e| IdentityError::Serialization(e.to_string()))?;
        Ok(Some(identity))
    }

    async fn save(&self, identity: &StoredIdentity) -> Result<(), IdentityError> {
        let path = self.path.as_ref().ok_or(IdentityError::NoLocation)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = to_json_stable_bytes(identity)
            .map_err(|e| IdentityError::Serialization(e.to_string()))?;
        fs::write(path, content).await?;

        debug!(path = %path.display(), "identity saved");
        Ok(())
    }

    async fn clear(&self) -> Result<(), IdentityError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "identity cleared");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

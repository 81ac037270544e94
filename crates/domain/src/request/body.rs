//! HTTP Request body

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// HTTP request body with its content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    /// The content type (e.g., "application/json")
    pub content_type: String,
    /// The body content
    pub content: String,
}

impl RequestBody {
    /// Creates a JSON body from pre-encoded text.
    #[must_use]
    pub fn json(content: impl Into<String>) -> Self {
        Self {
            content_type: "application/json".to_string(),
            content: content.into(),
        }
    }

    /// Encodes a value as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidBody`] if the value cannot be serialized.
    pub fn json_value<T: Serialize>(value: &T) -> DomainResult<Self> {
        serde_json::to_string(value)
            .map(Self::json)
            .map_err(|e| DomainError::InvalidBody(e.to_string()))
    }
}

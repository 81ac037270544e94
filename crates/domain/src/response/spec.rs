//! Response specification type

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

/// Status code the API uses for a missing or expired access token.
pub const UNAUTHORIZED: u16 = 401;

/// HTTP response as seen by the application layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSpec {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers_map: HashMap<String, String>,
    /// Raw response body
    pub body: Vec<u8>,
    /// Time from send to last body byte
    pub duration: Duration,
}

impl ResponseSpec {
    /// Creates a new response.
    #[must_use]
    pub fn new(
        status: u16,
        headers_map: HashMap<String, String>,
        body: Vec<u8>,
        duration: Duration,
    ) -> Self {
        let headers_map = headers_map
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Self {
            status,
            headers_map,
            body,
            duration,
        }
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Returns true if the server rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        self.status == UNAUTHORIZED
    }

    /// Returns a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers_map
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_as_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns at most `max_chars` characters of the body, for error reports.
    #[must_use]
    pub fn body_snippet(&self, max_chars: usize) -> String {
        self.body_as_string_lossy().chars().take(max_chars).collect()
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the decoder error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

//! Client configuration read from the environment.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `NEXT_PUBLIC_API_URL` | API base URL, shared with the web frontend | |
//! | `VERDANT_API_URL` | API base URL | `http://localhost:8000` |
//! | `VERDANT_TIMEOUT_MS` | Per-request timeout | `30000` |
//! | `VERDANT_IDENTITY_PATH` | Stored identity file | `<data dir>/verdant/identity.json` |
//! | `VERDANT_REFRESH_TOKEN` | Refresh cookie value to send explicitly | cookie jar |
//! | `VERDANT_EMAIL` | Account email for password sign-in | |
//! | `VERDANT_PASSWORD` | Account password for password sign-in | |
//!
//! Empty values count as unset. The email and password are only used
//! together.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use verdant_application::ApiBase;
use verdant_domain::{LoginCredentials, SessionCredential};

/// API base URL used when nothing is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Request timeout used when nothing is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const API_URL_VARS: [&str; 2] = ["NEXT_PUBLIC_API_URL", "VERDANT_API_URL"];
const TIMEOUT_VAR: &str = "VERDANT_TIMEOUT_MS";
const IDENTITY_PATH_VAR: &str = "VERDANT_IDENTITY_PATH";
const REFRESH_TOKEN_VAR: &str = "VERDANT_REFRESH_TOKEN";
const EMAIL_VAR: &str = "VERDANT_EMAIL";
const PASSWORD_VAR: &str = "VERDANT_PASSWORD";

/// Errors in the client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API URL is not an absolute http(s) URL.
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl {
        /// The rejected value
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A numeric variable did not parse.
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber {
        /// Variable name
        name: &'static str,
        /// The rejected value
        value: String,
    },

    /// Only one of the email and password variables is set.
    #[error("{missing} must be set together with {present}")]
    IncompleteLogin {
        /// The variable that is set
        present: &'static str,
        /// The variable that is missing
        missing: &'static str,
    },
}

/// Settings for one client process.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL without a trailing slash
    pub api_url: String,
    /// Timeout applied to every request
    pub request_timeout: Duration,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Where the signed-in username is stored, if a location is known
    pub identity_path: Option<PathBuf>,
    /// How the refresh session is presented to the API
    pub credential: SessionCredential,
    /// Email and password for signing in, if configured
    pub login: Option<LoginCredentials>,
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable or `None` if it is unset.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_url = API_URL_VARS
            .iter()
            .find_map(|name| var(name))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_ms = match var(TIMEOUT_VAR) {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: TIMEOUT_VAR,
                        value,
                    });
                }
            },
            None => DEFAULT_TIMEOUT_MS,
        };

        let identity_path = var(IDENTITY_PATH_VAR)
            .map(PathBuf::from)
            .or_else(default_identity_path);

        let credential = var(REFRESH_TOKEN_VAR)
            .map_or(SessionCredential::Ambient, SessionCredential::RefreshCookie);

        let login = match (var(EMAIL_VAR), lookup(PASSWORD_VAR).filter(|v| !v.is_empty())) {
            (Some(email), Some(password)) => Some(LoginCredentials::new(email.trim(), password)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::IncompleteLogin {
                    present: EMAIL_VAR,
                    missing: PASSWORD_VAR,
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteLogin {
                    present: PASSWORD_VAR,
                    missing: EMAIL_VAR,
                });
            }
        };

        Ok(Self {
            api_url: normalize_api_url(&api_url)?,
            request_timeout: Duration::from_millis(timeout_ms),
            user_agent: default_user_agent(),
            identity_path,
            credential,
            login,
        })
    }

    /// Replaces the API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not an absolute http(s) URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(url)?;
        Ok(self)
    }

    /// The API base requests are resolved against.
    #[must_use]
    pub fn api_base(&self) -> ApiBase {
        ApiBase::new(&self.api_url)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ConfigError::InvalidApiUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    Ok(trimmed.to_string())
}

fn default_identity_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("verdant").join("identity.json"))
}

fn default_user_agent() -> String {
    format!("Verdant/{}", env!("CARGO_PKG_VERSION"))
}

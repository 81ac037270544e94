//! Verdant Domain - Core types
//!
//! This crate defines the domain model for the Verdant API client:
//! access tokens and session credentials, user projections, and the
//! transport-neutral request/response types. All types here are pure
//! Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod request;
pub mod response;
pub mod user;

pub use auth::{AccessToken, LoginCredentials, REFRESH_COOKIE_NAME, SessionCredential};
pub use error::{DomainError, DomainResult};
pub use request::{Header, Headers, HttpMethod, RequestBody, RequestSpec};
pub use response::ResponseSpec;
pub use user::{CurrentUser, StoredIdentity, UserSummary};

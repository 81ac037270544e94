//! Authentication domain types

mod credential;
mod token;

pub use credential::{LoginCredentials, REFRESH_COOKIE_NAME, SessionCredential};
pub use token::AccessToken;

//! Verdant Application - Auth session, ports and use cases
//!
//! This crate defines the application layer with:
//! - Port traits (interfaces for the HTTP transport, identity storage, clock)
//! - The access-token lifecycle (token store, single-flight refresh,
//!   authenticated requests with one retry on 401)
//! - Use case orchestration on top of the authenticated session

pub mod auth;
pub mod error;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{
    ApiBase, ApiRequest, AuthError, AuthSession, RefreshCoordinator, TokenStatus, TokenStore,
};
pub use error::{ApplicationError, ApplicationResult};
pub use ports::{
    CancellationReceiver, CancellationToken, Clock, HttpClient, HttpClientError, IdentityError,
    IdentityRepository,
};
pub use use_cases::{IdentityState, ResolveIdentity, SocialDirectory};

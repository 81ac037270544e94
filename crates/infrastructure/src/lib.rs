//! Verdant Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, plus the environment-driven
//! client configuration.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod serialization;

pub use adapters::{ReqwestHttpClient, SystemClock};
pub use config::{ClientConfig, ConfigError};
pub use persistence::FileIdentityRepository;
pub use serialization::{SerializationError, from_json_bytes, to_json_stable, to_json_stable_bytes};

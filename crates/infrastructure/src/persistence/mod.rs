//! Local persistence.

mod identity_repository;

pub use identity_repository::FileIdentityRepository;

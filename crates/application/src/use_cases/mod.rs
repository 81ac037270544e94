//! Application use cases (business logic orchestration).

mod identity;
mod social;

pub use identity::{IdentityState, ResolveIdentity};
pub use social::SocialDirectory;

//! Wall-clock port

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Persisted identity records are stamped through this port so tests can
/// pin the timestamp.
pub trait Clock: Send + Sync {
    /// Returns the current UTC timestamp.
    fn now(&self) -> DateTime<Utc>;
}

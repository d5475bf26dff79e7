//! Entity identity and optimistic-locking version.
//!
//! Every aggregate is an `Entity`: something with a stable id and a
//! version used for optimistic concurrency control.

use std::fmt::Display;
use std::str::FromStr;

/// An object with a stable identity and a version used for optimistic
/// locking.
pub trait Entity: Send + Sync {
    /// The entity's identifier type.
    type Id: FromStr + Clone + Display;

    /// The current version: the count of events applied, minus one.
    /// `-1` before any event has been applied.
    fn version(&self) -> i64;
}

//! Aggregate abstraction.
//!
//! Constrains the core behavior of an aggregate:
//! - `execute` turns a command into events without changing state;
//! - `apply` folds an event into state, changing it;
//! - `Entity` gives the aggregate identity and a version.

use crate::entity::Entity;
use crate::event::DomainEvent;
use std::error::Error;

/// Pure command/event state machine.
///
/// `execute` is a total function over the closed set of commands: it
/// validates and produces events but never mutates `self`. `apply` is a
/// total function over the closed set of events, used both to fold newly
/// raised events and to replay history.
///
/// Unlike the teacher's `Aggregate`, this trait does not require
/// `Serialize`/`DeserializeOwned` on the aggregate itself: that bound
/// exists upstream to support snapshotting, and snapshots are an
/// explicit non-goal here (the core must be correct without them).
pub trait Aggregate: Entity + Send + Sync {
    const TYPE: &'static str;

    /// Commands this aggregate accepts.
    type Command;
    /// Events this aggregate emits.
    type Event: DomainEvent;
    /// Error raised by command validation.
    type Error: Error + Send + Sync + 'static;

    /// Validate `command` against the current state and produce the
    /// events it raises. Emits no events for a command that would be a
    /// no-op. Never mutates `self`.
    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Fold `event` into state and advance the version by one.
    fn apply(&mut self, event: &Self::Event);
}

//! Event store abstraction: append-only, per-stream versioned,
//! globally ordered.

use crate::error::BankError;
use crate::event::{AccountEventPayload, AccountId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// An event as it exists once durably persisted: the in-memory envelope
/// plus the two fields only the store can assign.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub stream_id: AccountId,
    pub version: i64,
    pub occurred_on: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
    /// Strictly monotonically increasing across the whole store; the
    /// projector's cursor.
    pub global_position: i64,
    pub metadata: Value,
    pub payload: AccountEventPayload,
}

/// Append-only, per-stream-versioned, globally-ordered event log.
///
/// Implementations must guarantee: appends to the same stream are
/// linearized (no two concurrent appends both succeed against the same
/// `expected_version`), and `global_position` is assigned in append
/// order across all streams.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append `events` to `stream_id`, failing the whole batch if the
    /// stream's current version is not `expected_version`.
    ///
    /// `expected_version` is the version of the last event already in
    /// the stream (`-1` for a brand new stream). On success the
    /// appended events occupy versions
    /// `expected_version + 1 ..= expected_version + events.len()`.
    async fn append(
        &self,
        stream_id: AccountId,
        expected_version: i64,
        events: &[AccountEventPayload],
        occurred_on: DateTime<Utc>,
        metadata: Value,
    ) -> Result<Vec<StoredEvent>, BankError>;

    /// Load every event in `stream_id`, in version order. An empty
    /// result means the stream does not exist.
    async fn load_stream(&self, stream_id: AccountId) -> Result<Vec<StoredEvent>, BankError>;

    /// Load up to `limit` events with `global_position > after`, in
    /// position order. The projector's read cursor.
    async fn load_after(
        &self,
        after: i64,
        limit: i64,
    ) -> Result<Vec<StoredEvent>, BankError>;
}

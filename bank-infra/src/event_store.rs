//! Postgres-backed [`EventStore`].
//!
//! Optimistic concurrency is enforced by the database itself: the
//! `events (stream_id, version)` unique constraint, not a
//! `SELECT ... FOR UPDATE`. A conflicting append fails on constraint
//! violation and is mapped to [`BankError::ConcurrencyConflict`] rather
//! than detected ahead of time, which keeps the common path to a single
//! round trip.

use async_trait::async_trait;
use bank_domain::codec;
use bank_domain::error::BankError;
use bank_domain::event::{AccountEventPayload, AccountId};
use bank_domain::store::{EventStore, StoredEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_stored_event(
        event_id: Uuid,
        stream_id: Uuid,
        version: i64,
        event_type: String,
        payload: Value,
        metadata: Value,
        occurred_on: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
        global_position: i64,
    ) -> Result<StoredEvent, BankError> {
        let payload = codec::decode(&event_type, &payload)?;
        Ok(StoredEvent {
            event_id,
            stream_id: AccountId(stream_id),
            version,
            occurred_on,
            recorded_at,
            global_position,
            metadata,
            payload,
        })
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(
        &self,
        stream_id: AccountId,
        expected_version: i64,
        events: &[AccountEventPayload],
        occurred_on: DateTime<Utc>,
        metadata: Value,
    ) -> Result<Vec<StoredEvent>, BankError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self.pool.begin().await.map_err(BankError::storage)?;
        let mut stored = Vec::with_capacity(events.len());

        for (offset, payload) in events.iter().enumerate() {
            let version = expected_version + 1 + offset as i64;
            let event_id = Uuid::new_v4();
            let event_type = {
                use bank_domain::event::DomainEvent;
                payload.event_type()
            };
            let body = codec::encode(payload)?;

            let insert = sqlx::query(
                "INSERT INTO events
                    (event_id, stream_id, version, event_type, payload, metadata, occurred_on)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING global_position, recorded_at",
            )
            .bind(event_id)
            .bind(stream_id.0)
            .bind(version)
            .bind(event_type)
            .bind(&body)
            .bind(&metadata)
            .bind(occurred_on)
            .fetch_one(&mut *tx)
            .await;

            let row = match insert {
                Ok(row) => row,
                Err(sqlx::Error::Database(db_err))
                    if db_err.kind() == sqlx::error::ErrorKind::UniqueViolation =>
                {
                    let actual = current_version(&mut tx, stream_id.0)
                        .await
                        .unwrap_or(expected_version);
                    warn!(
                        %stream_id,
                        expected_version,
                        actual_version = actual,
                        "append conflict: stream advanced past the expected version"
                    );
                    return Err(BankError::concurrency_conflict(
                        stream_id.to_string(),
                        expected_version,
                        actual,
                    ));
                }
                Err(e) => return Err(BankError::storage(e)),
            };

            let global_position: i64 = row.try_get("global_position").map_err(BankError::storage)?;
            let recorded_at: DateTime<Utc> =
                row.try_get("recorded_at").map_err(BankError::storage)?;

            stored.push(Self::row_to_stored_event(
                event_id,
                stream_id.0,
                version,
                event_type.to_string(),
                body,
                metadata.clone(),
                occurred_on,
                recorded_at,
                global_position,
            )?);
        }

        tx.commit().await.map_err(BankError::storage)?;
        Ok(stored)
    }

    async fn load_stream(&self, stream_id: AccountId) -> Result<Vec<StoredEvent>, BankError> {
        let rows = sqlx::query(
            "SELECT event_id, stream_id, version, event_type, payload, metadata,
                    occurred_on, recorded_at, global_position
             FROM events
             WHERE stream_id = $1
             ORDER BY version ASC",
        )
        .bind(stream_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(BankError::storage)?;

        rows.into_iter().map(row_to_event).collect()
    }

    async fn load_after(&self, after: i64, limit: i64) -> Result<Vec<StoredEvent>, BankError> {
        let rows = sqlx::query(
            "SELECT event_id, stream_id, version, event_type, payload, metadata,
                    occurred_on, recorded_at, global_position
             FROM events
             WHERE global_position > $1
             ORDER BY global_position ASC
             LIMIT $2",
        )
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(BankError::storage)?;

        rows.into_iter().map(row_to_event).collect()
    }
}

fn row_to_event(row: sqlx::postgres::PgRow) -> Result<StoredEvent, BankError> {
    let event_id: Uuid = row.try_get("event_id").map_err(BankError::storage)?;
    let stream_id: Uuid = row.try_get("stream_id").map_err(BankError::storage)?;
    let version: i64 = row.try_get("version").map_err(BankError::storage)?;
    let event_type: String = row.try_get("event_type").map_err(BankError::storage)?;
    let payload: Value = row.try_get("payload").map_err(BankError::storage)?;
    let metadata: Value = row.try_get("metadata").map_err(BankError::storage)?;
    let occurred_on: DateTime<Utc> = row.try_get("occurred_on").map_err(BankError::storage)?;
    let recorded_at: DateTime<Utc> = row.try_get("recorded_at").map_err(BankError::storage)?;
    let global_position: i64 = row
        .try_get("global_position")
        .map_err(BankError::storage)?;

    PgEventStore::row_to_stored_event(
        event_id,
        stream_id,
        version,
        event_type,
        payload,
        metadata,
        occurred_on,
        recorded_at,
        global_position,
    )
}

async fn current_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    stream_id: Uuid,
) -> Result<i64, BankError> {
    let row = sqlx::query("SELECT max(version) AS v FROM events WHERE stream_id = $1")
        .bind(stream_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(BankError::storage)?;
    let v: Option<i64> = row.try_get("v").map_err(BankError::storage)?;
    Ok(v.unwrap_or(-1))
}

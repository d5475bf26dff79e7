//! The account balance projector: a single long-running poll loop that
//! reads the event log from its last checkpoint and keeps
//! `account_balance` current.
//!
//! Grounded on the teacher's `EventEngine::spawn_periodic` /
//! `EngineHandle` shutdown pattern, simplified to one worker instead of
//! three: there is no outbox or handler registry here, just poll,
//! apply, checkpoint.

use bank_domain::error::BankError;
use bank_domain::read_model::ReadModelStore;
use bank_domain::store::EventStore;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const BATCH_SIZE: i64 = 100;
const EMPTY_BATCH_SLEEP: Duration = Duration::from_millis(400);
const ERROR_BACKOFF_SLEEP: Duration = Duration::from_secs(2);

pub struct Projector<S: EventStore, R: ReadModelStore> {
    name: String,
    store: Arc<S>,
    read_model: Arc<R>,
    checkpoints: PgPool,
}

impl<S: EventStore + 'static, R: ReadModelStore + 'static> Projector<S, R> {
    pub fn new(name: impl Into<String>, store: Arc<S>, read_model: Arc<R>, checkpoints: PgPool) -> Self {
        Self {
            name: name.into(),
            store,
            read_model,
            checkpoints,
        }
    }

    /// Start the poll loop as a background task. Dropping or cancelling
    /// the returned [`ProjectorHandle`] stops it after the in-flight
    /// batch finishes.
    pub fn start(self: Arc<Self>) -> ProjectorHandle {
        let token = CancellationToken::new();
        let task = {
            let projector = self.clone();
            let token = token.clone();
            tokio::spawn(async move { projector.run(token).await })
        };
        ProjectorHandle { token, task }
    }

    async fn run(&self, token: CancellationToken) {
        loop {
            if token.is_cancelled() {
                return;
            }

            match self.step().await {
                Ok(0) => {
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(EMPTY_BATCH_SLEEP) => {}
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    error!(projector = %self.name, error = %err, "projector step failed, backing off");
                    tokio::select! {
                        _ = token.cancelled() => return,
                        _ = tokio::time::sleep(ERROR_BACKOFF_SLEEP) => {}
                    }
                }
            }
        }
    }

    /// Process one batch. Returns the number of events applied.
    async fn step(&self) -> Result<usize, BankError> {
        let checkpoint = self.load_checkpoint().await?;
        let events = self.store.load_after(checkpoint, BATCH_SIZE).await?;
        if events.is_empty() {
            return Ok(0);
        }
        debug!(projector = %self.name, batch_size = events.len(), checkpoint, "applying batch");

        self.read_model.apply_batch(&events).await?;

        let last_position = events.last().expect("non-empty").global_position;
        self.save_checkpoint(last_position).await?;
        debug!(projector = %self.name, checkpoint = last_position, "checkpoint advanced");
        Ok(events.len())
    }

    async fn load_checkpoint(&self) -> Result<i64, BankError> {
        let row = sqlx::query(
            "SELECT last_position FROM projector_checkpoints WHERE projector_name = $1",
        )
        .bind(&self.name)
        .fetch_optional(&self.checkpoints)
        .await
        .map_err(BankError::storage)?;

        match row {
            Some(row) => row.try_get("last_position").map_err(BankError::storage),
            None => Ok(0),
        }
    }

    async fn save_checkpoint(&self, position: i64) -> Result<(), BankError> {
        sqlx::query(
            "INSERT INTO projector_checkpoints (projector_name, last_position, updated_at)
             VALUES ($1, $2, now())
             ON CONFLICT (projector_name) DO UPDATE SET
                last_position = EXCLUDED.last_position,
                updated_at = now()",
        )
        .bind(&self.name)
        .bind(position)
        .execute(&self.checkpoints)
        .await
        .map_err(BankError::storage)?;
        Ok(())
    }
}

pub struct ProjectorHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ProjectorHandle {
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl Drop for ProjectorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

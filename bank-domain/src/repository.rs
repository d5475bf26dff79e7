//! Aggregate repository: load-by-replay, save-by-append.

use crate::account::{Account, AccountCommand};
use crate::entity::Entity;
use crate::error::BankError;
use crate::event::AccountId;
use crate::store::{EventStore, StoredEvent};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Loads and persists [`Account`] aggregates against an [`EventStore`].
/// The only place command execution, event application, and storage
/// meet.
#[async_trait]
pub trait AggregateRepository: Send + Sync {
    async fn load(&self, id: AccountId) -> Result<Account, BankError>;

    /// Execute `command` against the aggregate currently at `id`,
    /// append the resulting events, and return the reloaded aggregate.
    /// A concurrent writer between load and append surfaces as
    /// [`BankError::ConcurrencyConflict`]; the caller should retry.
    async fn execute(
        &self,
        id: AccountId,
        command: AccountCommand,
        metadata: Value,
    ) -> Result<Account, BankError>;

    /// Open a brand new account, appending its opening event.
    async fn open(
        &self,
        holder_name: String,
        overdraft_limit: rust_decimal::Decimal,
        initial_balance: crate::money::Money,
        metadata: Value,
    ) -> Result<Account, BankError>;
}

/// The store-backed implementation, generic over any [`EventStore`].
pub struct EventSourcedRepository<S: EventStore> {
    store: Arc<S>,
}

impl<S: EventStore> EventSourcedRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn rehydrate(id: AccountId, stored: Vec<StoredEvent>) -> Result<Account, BankError> {
        let events: Vec<(i64, crate::event::AccountEventPayload)> =
            stored.into_iter().map(|e| (e.version, e.payload)).collect();
        Account::from_history(id, &events)
    }
}

#[async_trait]
impl<S: EventStore> AggregateRepository for EventSourcedRepository<S> {
    async fn load(&self, id: AccountId) -> Result<Account, BankError> {
        let stored = self.store.load_stream(id).await?;
        Self::rehydrate(id, stored)
    }

    async fn execute(
        &self,
        id: AccountId,
        command: AccountCommand,
        metadata: Value,
    ) -> Result<Account, BankError> {
        let account = self.load(id).await?;
        let events = account.execute(command)?;
        if events.is_empty() {
            return Ok(account);
        }
        self.store
            .append(id, account.version(), &events, Utc::now(), metadata)
            .await?;
        self.load(id).await
    }

    async fn open(
        &self,
        holder_name: String,
        overdraft_limit: rust_decimal::Decimal,
        initial_balance: crate::money::Money,
        metadata: Value,
    ) -> Result<Account, BankError> {
        let id = AccountId::new();
        let now = Utc::now();
        let (_, event) = Account::open(id, holder_name, overdraft_limit, initial_balance, Some(now))?;
        self.store.append(id, -1, &[event], now, metadata).await?;
        self.load(id).await
    }
}

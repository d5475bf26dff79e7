//! Pure, I/O-free event-sourcing core for the bank account aggregate:
//! the aggregate state machine, its event taxonomy, the money value
//! type, the unified error taxonomy, and the store/repository/read-model
//! trait boundaries that `bank-infra` implements against Postgres.

pub mod account;
pub mod aggregate;
pub mod codec;
pub mod entity;
pub mod error;
pub mod event;
pub mod money;
pub mod read_model;
pub mod repository;
pub mod store;

pub use account::{Account, AccountCommand};
pub use aggregate::Aggregate;
pub use entity::Entity;
pub use error::{BankError, BankResult, ErrorCode, ErrorKind};
pub use event::{AccountEvent, AccountEventPayload, AccountId, AccountStatus, DomainEvent};
pub use money::{CurrencyCode, Money};
pub use read_model::ReadModelStore;
pub use repository::{AggregateRepository, EventSourcedRepository};
pub use store::{EventStore, StoredEvent};

//! Domain event taxonomy.
//!
//! A closed set of nine event types. Each carries the envelope fields
//! every event shares (`event_id`, `stream_id`, `version`, `occurred_on`,
//! `metadata`) plus a payload specific to its variant. `recorded_at` and
//! `global_position` are assigned by the store and therefore live on the
//! persisted envelope ([`crate::store::StoredEvent`]), not here.

use crate::money::Money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identity: the stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The closed set of account lifecycle states.
///
/// `New` is a pre-opening, in-memory-only state: no event ever
/// establishes it, and the projector never writes it to the read model
/// (see spec's open question on status wire format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    New,
    Open,
    Frozen,
    Closed,
}

impl AccountStatus {
    /// The exact string the read model and wire format use.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Open => "Open",
            Self::Frozen => "Frozen",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The minimal interface a domain event payload must provide.
pub trait DomainEvent: Clone + PartialEq + fmt::Debug + Send + Sync {
    /// The canonical, closed-set type tag (e.g. `"MoneyDeposited"`).
    fn event_type(&self) -> &'static str;
}

/// The nine-member closed set of account event payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEventPayload {
    BankAccountOpened {
        account_holder: String,
        overdraft_limit: Decimal,
        initial_balance: Money,
    },
    MoneyDeposited {
        amount: Money,
    },
    MoneyWithdrawn {
        amount: Money,
    },
    AccountFrozen,
    AccountUnfrozen,
    AccountClosed,
    OverdraftLimitChanged {
        new_overdraft_limit: Decimal,
    },
    AccountHolderNameChanged {
        new_account_holder_name: String,
    },
    FeeApplied {
        fee_amount: Money,
        reason: String,
    },
}

impl AccountEventPayload {
    pub const BANK_ACCOUNT_OPENED: &'static str = "BankAccountOpened";
    pub const MONEY_DEPOSITED: &'static str = "MoneyDeposited";
    pub const MONEY_WITHDRAWN: &'static str = "MoneyWithdrawn";
    pub const ACCOUNT_FROZEN: &'static str = "AccountFrozen";
    pub const ACCOUNT_UNFROZEN: &'static str = "AccountUnfrozen";
    pub const ACCOUNT_CLOSED: &'static str = "AccountClosed";
    pub const OVERDRAFT_LIMIT_CHANGED: &'static str = "OverdraftLimitChanged";
    pub const ACCOUNT_HOLDER_NAME_CHANGED: &'static str = "AccountHolderNameChanged";
    pub const FEE_APPLIED: &'static str = "FeeApplied";

    /// All nine canonical tags, in taxonomy order.
    pub const ALL_TAGS: [&'static str; 9] = [
        Self::BANK_ACCOUNT_OPENED,
        Self::MONEY_DEPOSITED,
        Self::MONEY_WITHDRAWN,
        Self::ACCOUNT_FROZEN,
        Self::ACCOUNT_UNFROZEN,
        Self::ACCOUNT_CLOSED,
        Self::OVERDRAFT_LIMIT_CHANGED,
        Self::ACCOUNT_HOLDER_NAME_CHANGED,
        Self::FEE_APPLIED,
    ];
}

impl DomainEvent for AccountEventPayload {
    fn event_type(&self) -> &'static str {
        match self {
            Self::BankAccountOpened { .. } => Self::BANK_ACCOUNT_OPENED,
            Self::MoneyDeposited { .. } => Self::MONEY_DEPOSITED,
            Self::MoneyWithdrawn { .. } => Self::MONEY_WITHDRAWN,
            Self::AccountFrozen => Self::ACCOUNT_FROZEN,
            Self::AccountUnfrozen => Self::ACCOUNT_UNFROZEN,
            Self::AccountClosed => Self::ACCOUNT_CLOSED,
            Self::OverdraftLimitChanged { .. } => Self::OVERDRAFT_LIMIT_CHANGED,
            Self::AccountHolderNameChanged { .. } => Self::ACCOUNT_HOLDER_NAME_CHANGED,
            Self::FeeApplied { .. } => Self::FEE_APPLIED,
        }
    }
}

/// An event together with the envelope fields every event carries, as it
/// exists in memory before being handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountEvent {
    pub event_id: Uuid,
    pub stream_id: AccountId,
    pub version: i64,
    pub occurred_on: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub payload: AccountEventPayload,
}

impl AccountEvent {
    pub fn new(
        stream_id: AccountId,
        version: i64,
        payload: AccountEventPayload,
        occurred_on: DateTime<Utc>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            stream_id,
            version,
            occurred_on,
            metadata,
            payload,
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }
}

//! Read model abstraction: the query side of CQRS, kept current by the
//! projector and never written to by command handling directly.

use crate::error::BankError;
use crate::event::AccountId;
use crate::money::{CurrencyCode, Money};
use crate::store::StoredEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A denormalized, queryable projection of one account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalanceRow {
    pub account_id: AccountId,
    pub holder_name: String,
    pub status: String,
    pub balance: Money,
    pub overdraft_limit: Decimal,
    /// `balance.amount + overdraft_limit`, materialized as its own column
    /// (spec.md §6) rather than recomputed on read, since the projector
    /// already knows the delta that produced it.
    pub available_to_withdraw: Decimal,
    /// The version of the last event folded into this row. Used by the
    /// projector to discard events it has already applied.
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl AccountBalanceRow {
    pub fn compute_available_to_withdraw(balance: Decimal, overdraft_limit: Decimal) -> Decimal {
        balance + overdraft_limit
    }
}

/// A row in the overdrawn view: an account whose balance has gone
/// negative, ranked by how much of its overdraft headroom it has used.
#[derive(Debug, Clone, PartialEq)]
pub struct OverdrawnRow {
    pub account_id: AccountId,
    pub holder_name: String,
    pub balance: Money,
    pub overdraft_limit: Decimal,
    /// `|balance| / overdraft_limit * 100`, or `100` when the limit is
    /// zero (an account with no overdraft headroom that is somehow
    /// negative is maximally overdrawn by definition).
    pub usage_percent: Decimal,
}

impl OverdrawnRow {
    pub fn compute_usage_percent(balance: &Money, overdraft_limit: Decimal) -> Decimal {
        let one_hundred = Decimal::from(100);
        if overdraft_limit.is_zero() {
            return one_hundred;
        }
        (balance.amount.abs() / overdraft_limit) * one_hundred
    }
}

/// Aggregate counts per status and balance sums per currency (sums are
/// never combined across currencies, since this system does not convert
/// between them).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountSummary {
    pub total_accounts: i64,
    pub open_accounts: i64,
    pub frozen_accounts: i64,
    pub closed_accounts: i64,
    pub balance_by_currency: Vec<(CurrencyCode, Decimal)>,
}

/// The whitelisted set of columns a caller may sort by. Using a closed
/// enum rather than a caller-supplied string is the injection defense:
/// there is no code path that interpolates a string into `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    UpdatedAt,
    BalanceAmount,
    AvailableToWithdraw,
    OverdraftLimit,
    HolderName,
    Status,
}

#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<String>,
    pub sort_by: Option<SortColumn>,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// The query side. Implementations read a store the projector keeps
/// current; they never derive state from the event log directly.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    async fn get_balance(&self, account_id: AccountId) -> Result<Option<AccountBalanceRow>, BankError>;

    async fn list(&self, filter: ListFilter) -> Result<Vec<AccountBalanceRow>, BankError>;

    /// Accounts with a negative balance, ranked by overdraft usage
    /// percent descending.
    async fn list_overdrawn(&self, limit: i64) -> Result<Vec<OverdrawnRow>, BankError>;

    async fn summary(&self) -> Result<AccountSummary, BankError>;

    /// Apply a batch of events, in the order given, inside a single
    /// read-model transaction: dispatch each event on its type tag and
    /// apply the matching idempotent SQL update (spec.md §4.H), then
    /// commit once the whole batch has been applied. On error the
    /// transaction is rolled back and nothing in the batch takes effect,
    /// so the projector's checkpoint is safe to leave unadvanced and
    /// retry the whole batch. Each per-row update is guarded by
    /// `version < event.version`, so re-applying an already-applied
    /// batch is a no-op.
    async fn apply_batch(&self, events: &[StoredEvent]) -> Result<(), BankError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[test]
    fn usage_percent_is_maximal_when_overdraft_limit_is_zero() {
        let balance = Money::new(dec!(-50), usd());
        assert_eq!(
            OverdrawnRow::compute_usage_percent(&balance, dec!(0)),
            dec!(100)
        );
    }

    #[test]
    fn usage_percent_is_the_overdraft_fraction_used() {
        let balance = Money::new(dec!(-25), usd());
        assert_eq!(
            OverdrawnRow::compute_usage_percent(&balance, dec!(100)),
            dec!(25)
        );
    }

    #[test]
    fn available_to_withdraw_adds_overdraft_headroom() {
        assert_eq!(
            AccountBalanceRow::compute_available_to_withdraw(dec!(10), dec!(40)),
            dec!(50)
        );
    }
}

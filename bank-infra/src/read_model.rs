//! Postgres-backed [`ReadModelStore`]: the query side the projector
//! keeps current via per-event-type idempotent SQL updates (spec.md
//! §4.H), not a full-row rewrite.

use async_trait::async_trait;
use bank_domain::error::BankError;
use bank_domain::event::{AccountEventPayload, AccountId};
use bank_domain::money::{CurrencyCode, Money};
use bank_domain::read_model::{
    AccountBalanceRow, AccountSummary, ListFilter, OverdrawnRow, ReadModelStore, SortColumn,
};
use bank_domain::store::StoredEvent;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};

pub struct PgReadModelStore {
    pool: PgPool,
}

impl PgReadModelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_balance(row: sqlx::postgres::PgRow) -> Result<AccountBalanceRow, BankError> {
    let account_id: uuid::Uuid = row.try_get("account_id").map_err(BankError::storage)?;
    let currency: String = row
        .try_get("balance_currency")
        .map_err(BankError::storage)?;
    let currency: CurrencyCode = currency.trim().parse()?;
    Ok(AccountBalanceRow {
        account_id: AccountId(account_id),
        holder_name: row.try_get("holder_name").map_err(BankError::storage)?,
        status: row.try_get("status").map_err(BankError::storage)?,
        balance: Money::new(
            row.try_get("balance_amount").map_err(BankError::storage)?,
            currency,
        ),
        overdraft_limit: row
            .try_get("overdraft_limit")
            .map_err(BankError::storage)?,
        available_to_withdraw: row
            .try_get("available_to_withdraw")
            .map_err(BankError::storage)?,
        version: row.try_get("version").map_err(BankError::storage)?,
        updated_at: row.try_get("updated_at").map_err(BankError::storage)?,
    })
}

#[async_trait]
impl ReadModelStore for PgReadModelStore {
    async fn get_balance(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountBalanceRow>, BankError> {
        let row = sqlx::query("SELECT * FROM account_balance WHERE account_id = $1")
            .bind(account_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(BankError::storage)?;
        row.map(row_to_balance).transpose()
    }

    async fn list(&self, filter: ListFilter) -> Result<Vec<AccountBalanceRow>, BankError> {
        let sort_column = match filter.sort_by.unwrap_or(SortColumn::UpdatedAt) {
            SortColumn::HolderName => "holder_name",
            SortColumn::BalanceAmount => "balance_amount",
            SortColumn::AvailableToWithdraw => "available_to_withdraw",
            SortColumn::OverdraftLimit => "overdraft_limit",
            SortColumn::Status => "status",
            SortColumn::UpdatedAt => "updated_at",
        };
        let direction = if filter.descending { "DESC" } else { "ASC" };
        let limit = if filter.limit > 0 { filter.limit } else { 100 };

        let query = format!(
            "SELECT * FROM account_balance
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY {sort_column} {direction}
             LIMIT $2 OFFSET $3"
        );

        let rows = sqlx::query(&query)
            .bind(filter.status)
            .bind(limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(BankError::storage)?;

        rows.into_iter().map(row_to_balance).collect()
    }

    async fn list_overdrawn(&self, limit: i64) -> Result<Vec<OverdrawnRow>, BankError> {
        let limit = if limit > 0 { limit } else { 100 };
        let rows = sqlx::query(
            "SELECT account_id, holder_name, balance_amount, balance_currency, overdraft_limit
             FROM account_balance
             WHERE balance_amount < 0
             ORDER BY
                CASE WHEN overdraft_limit = 0 THEN 1 ELSE abs(balance_amount) / overdraft_limit END
                DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(BankError::storage)?;

        rows.into_iter()
            .map(|row| {
                let account_id: uuid::Uuid =
                    row.try_get("account_id").map_err(BankError::storage)?;
                let currency: String = row
                    .try_get("balance_currency")
                    .map_err(BankError::storage)?;
                let currency: CurrencyCode = currency.trim().parse()?;
                let balance = Money::new(
                    row.try_get("balance_amount").map_err(BankError::storage)?,
                    currency,
                );
                let overdraft_limit: rust_decimal::Decimal = row
                    .try_get("overdraft_limit")
                    .map_err(BankError::storage)?;
                let usage_percent =
                    OverdrawnRow::compute_usage_percent(&balance, overdraft_limit);
                Ok(OverdrawnRow {
                    account_id: AccountId(account_id),
                    holder_name: row.try_get("holder_name").map_err(BankError::storage)?,
                    balance,
                    overdraft_limit,
                    usage_percent,
                })
            })
            .collect()
    }

    async fn summary(&self) -> Result<AccountSummary, BankError> {
        let counts = sqlx::query(
            "SELECT
                count(*) AS total,
                count(*) FILTER (WHERE status = 'Open') AS open,
                count(*) FILTER (WHERE status = 'Frozen') AS frozen,
                count(*) FILTER (WHERE status = 'Closed') AS closed
             FROM account_balance",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(BankError::storage)?;

        let sums = sqlx::query(
            "SELECT balance_currency, sum(balance_amount) AS total
             FROM account_balance
             GROUP BY balance_currency",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(BankError::storage)?;

        let mut balance_by_currency = Vec::with_capacity(sums.len());
        for row in sums {
            let currency: String = row
                .try_get("balance_currency")
                .map_err(BankError::storage)?;
            let currency: CurrencyCode = currency.trim().parse()?;
            let total: rust_decimal::Decimal = row.try_get("total").map_err(BankError::storage)?;
            balance_by_currency.push((currency, total));
        }

        Ok(AccountSummary {
            total_accounts: counts.try_get("total").map_err(BankError::storage)?,
            open_accounts: counts.try_get("open").map_err(BankError::storage)?,
            frozen_accounts: counts.try_get("frozen").map_err(BankError::storage)?,
            closed_accounts: counts.try_get("closed").map_err(BankError::storage)?,
            balance_by_currency,
        })
    }

    async fn apply_batch(&self, events: &[StoredEvent]) -> Result<(), BankError> {
        let mut tx = self.pool.begin().await.map_err(BankError::storage)?;
        for event in events {
            apply_one(&mut tx, event).await?;
        }
        tx.commit().await.map_err(BankError::storage)?;
        Ok(())
    }
}

/// Dispatch a single event onto its idempotent SQL update, per spec.md
/// §4.H, inside the caller's transaction.
async fn apply_one(tx: &mut Transaction<'_, Postgres>, event: &StoredEvent) -> Result<(), BankError> {
    match &event.payload {
        AccountEventPayload::BankAccountOpened {
            account_holder,
            overdraft_limit,
            initial_balance,
        } => {
            let available =
                AccountBalanceRow::compute_available_to_withdraw(initial_balance.amount, *overdraft_limit);
            sqlx::query(
                "INSERT INTO account_balance
                    (account_id, holder_name, status, balance_amount, balance_currency,
                     overdraft_limit, available_to_withdraw, version, updated_at)
                 VALUES ($1, $2, 'Open', $3, $4, $5, $6, $7, now())
                 ON CONFLICT (account_id) DO UPDATE SET
                    holder_name = EXCLUDED.holder_name,
                    status = EXCLUDED.status,
                    balance_amount = EXCLUDED.balance_amount,
                    balance_currency = EXCLUDED.balance_currency,
                    overdraft_limit = EXCLUDED.overdraft_limit,
                    available_to_withdraw = EXCLUDED.available_to_withdraw,
                    version = EXCLUDED.version,
                    updated_at = EXCLUDED.updated_at
                 WHERE account_balance.version < EXCLUDED.version",
            )
            .bind(event.stream_id.0)
            .bind(account_holder)
            .bind(initial_balance.amount)
            .bind(initial_balance.currency.as_str())
            .bind(overdraft_limit)
            .bind(available)
            .bind(event.version)
            .execute(&mut **tx)
            .await
            .map_err(BankError::storage)?;
        }
        AccountEventPayload::MoneyDeposited { amount } => {
            apply_balance_delta(tx, event, amount.amount).await?;
        }
        AccountEventPayload::MoneyWithdrawn { amount } => {
            apply_balance_delta(tx, event, -amount.amount).await?;
        }
        AccountEventPayload::FeeApplied { fee_amount, .. } => {
            apply_balance_delta(tx, event, -fee_amount.amount).await?;
        }
        AccountEventPayload::AccountFrozen => apply_status(tx, event, "Frozen").await?,
        AccountEventPayload::AccountUnfrozen => apply_status(tx, event, "Open").await?,
        AccountEventPayload::AccountClosed => apply_status(tx, event, "Closed").await?,
        AccountEventPayload::OverdraftLimitChanged {
            new_overdraft_limit,
        } => {
            sqlx::query(
                "UPDATE account_balance
                 SET overdraft_limit = $2,
                     available_to_withdraw = balance_amount + $2,
                     version = $3,
                     updated_at = now()
                 WHERE account_id = $1 AND version < $3",
            )
            .bind(event.stream_id.0)
            .bind(new_overdraft_limit)
            .bind(event.version)
            .execute(&mut **tx)
            .await
            .map_err(BankError::storage)?;
        }
        AccountEventPayload::AccountHolderNameChanged {
            new_account_holder_name,
        } => {
            sqlx::query(
                "UPDATE account_balance
                 SET holder_name = $2, version = $3, updated_at = now()
                 WHERE account_id = $1 AND version < $3",
            )
            .bind(event.stream_id.0)
            .bind(new_account_holder_name)
            .bind(event.version)
            .execute(&mut **tx)
            .await
            .map_err(BankError::storage)?;
        }
    }
    Ok(())
}

/// `MoneyDeposited`/`MoneyWithdrawn`/`FeeApplied` all reduce to the same
/// shape: add a signed delta to the balance and recompute the derived
/// `available_to_withdraw` column from it.
async fn apply_balance_delta(
    tx: &mut Transaction<'_, Postgres>,
    event: &StoredEvent,
    delta: Decimal,
) -> Result<(), BankError> {
    sqlx::query(
        "UPDATE account_balance
         SET balance_amount = balance_amount + $2,
             available_to_withdraw = (balance_amount + $2) + overdraft_limit,
             version = $3,
             updated_at = now()
         WHERE account_id = $1 AND version < $3",
    )
    .bind(event.stream_id.0)
    .bind(delta)
    .bind(event.version)
    .execute(&mut **tx)
    .await
    .map_err(BankError::storage)?;
    Ok(())
}

async fn apply_status(
    tx: &mut Transaction<'_, Postgres>,
    event: &StoredEvent,
    status: &str,
) -> Result<(), BankError> {
    sqlx::query(
        "UPDATE account_balance SET status = $2, version = $3, updated_at = now()
         WHERE account_id = $1 AND version < $3",
    )
    .bind(event.stream_id.0)
    .bind(status)
    .bind(event.version)
    .execute(&mut **tx)
    .await
    .map_err(BankError::storage)?;
    Ok(())
}

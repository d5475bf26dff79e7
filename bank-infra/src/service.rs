//! `AccountService`: the thin command/query adapter the demo binary (and
//! any future outer surface) drives. Not a generic multi-handler bus —
//! just the handful of calls a caller needs, delegating straight to the
//! repository and read model.

use bank_domain::account::AccountCommand;
use bank_domain::error::BankError;
use bank_domain::event::AccountId;
use bank_domain::money::Money;
use bank_domain::read_model::{
    AccountBalanceRow, AccountSummary, ListFilter, OverdrawnRow, ReadModelStore,
};
use bank_domain::repository::AggregateRepository;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;

pub struct AccountService<Repo: AggregateRepository, Rm: ReadModelStore> {
    repository: Arc<Repo>,
    read_model: Arc<Rm>,
}

impl<Repo: AggregateRepository, Rm: ReadModelStore> AccountService<Repo, Rm> {
    pub fn new(repository: Arc<Repo>, read_model: Arc<Rm>) -> Self {
        Self {
            repository,
            read_model,
        }
    }

    pub async fn open_account(
        &self,
        holder_name: String,
        overdraft_limit: Decimal,
        initial_balance: Money,
    ) -> Result<AccountId, BankError> {
        let account = self
            .repository
            .open(holder_name, overdraft_limit, initial_balance, empty_metadata())
            .await?;
        Ok(account.id())
    }

    pub async fn deposit(&self, account_id: AccountId, amount: Money) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::Deposit(amount), empty_metadata())
            .await?;
        Ok(())
    }

    pub async fn withdraw(&self, account_id: AccountId, amount: Money) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::Withdraw(amount), empty_metadata())
            .await?;
        Ok(())
    }

    pub async fn freeze(&self, account_id: AccountId) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::Freeze, empty_metadata())
            .await?;
        Ok(())
    }

    pub async fn unfreeze(&self, account_id: AccountId) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::Unfreeze, empty_metadata())
            .await?;
        Ok(())
    }

    pub async fn close(&self, account_id: AccountId) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::Close, empty_metadata())
            .await?;
        Ok(())
    }

    pub async fn change_overdraft_limit(
        &self,
        account_id: AccountId,
        new_limit: Decimal,
    ) -> Result<(), BankError> {
        self.repository
            .execute(
                account_id,
                AccountCommand::ChangeOverdraftLimit(new_limit),
                empty_metadata(),
            )
            .await?;
        Ok(())
    }

    pub async fn rename_holder(
        &self,
        account_id: AccountId,
        new_name: String,
    ) -> Result<(), BankError> {
        self.repository
            .execute(
                account_id,
                AccountCommand::ChangeAccountHolderName(new_name),
                empty_metadata(),
            )
            .await?;
        Ok(())
    }

    pub async fn apply_fee(
        &self,
        account_id: AccountId,
        amount: Money,
        reason: String,
    ) -> Result<(), BankError> {
        self.repository
            .execute(account_id, AccountCommand::ApplyFee { amount, reason }, empty_metadata())
            .await?;
        Ok(())
    }

    /// Read-side queries go straight to the read model, never through
    /// the repository: the read model is the only thing the projector
    /// keeps current for listing/search use cases.
    pub async fn get_balance(
        &self,
        account_id: AccountId,
    ) -> Result<Option<AccountBalanceRow>, BankError> {
        self.read_model.get_balance(account_id).await
    }

    pub async fn list_accounts(
        &self,
        filter: ListFilter,
    ) -> Result<Vec<AccountBalanceRow>, BankError> {
        self.read_model.list(filter).await
    }

    pub async fn list_overdrawn(&self, limit: i64) -> Result<Vec<OverdrawnRow>, BankError> {
        self.read_model.list_overdrawn(limit).await
    }

    pub async fn summary(&self) -> Result<AccountSummary, BankError> {
        self.read_model.summary().await
    }
}

fn empty_metadata() -> Value {
    Value::Object(Default::default())
}

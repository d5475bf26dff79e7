//! The bank account aggregate: a deterministic state machine whose state
//! is the fold of its event history, with business invariants enforced
//! at command time.

use crate::aggregate::Aggregate;
use crate::entity::Entity;
use crate::error::BankError;
use crate::event::{AccountEventPayload as Event, AccountId, AccountStatus};
use crate::money::Money;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Commands accepted by [`Account`]. One variant per row of the command
/// table.
#[derive(Debug, Clone)]
pub enum AccountCommand {
    Deposit(Money),
    Withdraw(Money),
    Freeze,
    Unfreeze,
    Close,
    ChangeOverdraftLimit(Decimal),
    ChangeAccountHolderName(String),
    ApplyFee { amount: Money, reason: String },
}

/// The aggregate. Reconstituted per command from its event history — it
/// is never cached as a long-lived mutable object across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    holder_name: String,
    status: AccountStatus,
    balance: Money,
    overdraft_limit: Decimal,
    version: i64,
}

impl Account {
    /// Open a new account. The only way to construct an `Account` "from
    /// nothing" — every other command requires `FromHistory`-rebuilt
    /// state first.
    pub fn open(
        id: AccountId,
        holder_name: impl Into<String>,
        overdraft_limit: Decimal,
        initial_balance: Money,
        occurred_on: Option<DateTime<Utc>>,
    ) -> Result<(Self, Event), BankError> {
        if id.0.is_nil() {
            return Err(BankError::invalid_argument("account id must not be nil"));
        }
        let holder_name = holder_name.into();
        if holder_name.trim().is_empty() {
            return Err(BankError::invalid_argument("holder name must not be empty"));
        }
        if overdraft_limit.is_sign_negative() {
            return Err(BankError::invalid_argument(
                "overdraft limit must be non-negative",
            ));
        }
        if initial_balance.amount.is_sign_negative() {
            return Err(BankError::invalid_argument(
                "initial balance must be non-negative",
            ));
        }
        let _ = occurred_on; // timestamping happens at the envelope layer (see repository)

        let event = Event::BankAccountOpened {
            account_holder: holder_name,
            overdraft_limit,
            initial_balance,
        };

        let mut account = Self {
            id,
            holder_name: String::new(),
            status: AccountStatus::New,
            balance: Money::zero(initial_balance.currency),
            overdraft_limit: Decimal::ZERO,
            version: -1,
        };
        account.apply(&event);

        Ok((account, event))
    }

    /// Rebuild an aggregate by folding its event history in order.
    /// Asserts that versions are contiguous from 0; a gap signals
    /// store/schema drift and is fatal.
    pub fn from_history(id: AccountId, events: &[(i64, Event)]) -> Result<Self, BankError> {
        let Some((first_version, first_payload)) = events.first() else {
            return Err(BankError::not_found(format!("account {id}")));
        };
        if *first_version != 0 {
            return Err(BankError::codec(format!(
                "stream {id} does not start at version 0 (got {first_version})"
            )));
        }

        let initial_balance = match first_payload {
            Event::BankAccountOpened {
                initial_balance, ..
            } => *initial_balance,
            other => {
                return Err(BankError::codec(format!(
                    "stream {id} does not start with BankAccountOpened (got {})",
                    other.event_type_name()
                )));
            }
        };

        let mut account = Self {
            id,
            holder_name: String::new(),
            status: AccountStatus::New,
            balance: Money::zero(initial_balance.currency),
            overdraft_limit: Decimal::ZERO,
            version: -1,
        };

        let mut expected_version = 0i64;
        for (version, payload) in events {
            if *version != expected_version {
                return Err(BankError::codec(format!(
                    "stream {id} has a version gap: expected {expected_version}, found {version}"
                )));
            }
            account.apply(payload);
            expected_version += 1;
        }

        Ok(account)
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn status(&self) -> AccountStatus {
        self.status
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn overdraft_limit(&self) -> Decimal {
        self.overdraft_limit
    }

    /// `balance + overdraft_limit`: the most the account can still be
    /// withdrawn down to before hitting the overdraft floor.
    pub fn available_to_withdraw(&self) -> Decimal {
        self.balance.amount + self.overdraft_limit
    }

    fn require_currency(&self, money: &Money) -> Result<(), BankError> {
        if money.currency != self.balance.currency {
            return Err(BankError::currency_mismatch(
                self.balance.currency,
                money.currency,
            ));
        }
        Ok(())
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn version(&self) -> i64 {
        self.version
    }
}

impl Aggregate for Account {
    const TYPE: &'static str = "account";

    type Command = AccountCommand;
    type Event = Event;
    type Error = BankError;

    fn execute(&self, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccountCommand::Deposit(amount) => self.execute_deposit(amount),
            AccountCommand::Withdraw(amount) => self.execute_withdraw(amount),
            AccountCommand::Freeze => self.execute_freeze(),
            AccountCommand::Unfreeze => self.execute_unfreeze(),
            AccountCommand::Close => self.execute_close(),
            AccountCommand::ChangeOverdraftLimit(limit) => self.execute_change_limit(limit),
            AccountCommand::ChangeAccountHolderName(name) => self.execute_rename(name),
            AccountCommand::ApplyFee { amount, reason } => self.execute_fee(amount, reason),
        }
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            Event::BankAccountOpened {
                account_holder,
                overdraft_limit,
                initial_balance,
            } => {
                self.holder_name = account_holder.clone();
                self.overdraft_limit = *overdraft_limit;
                self.balance = *initial_balance;
                self.status = AccountStatus::Open;
            }
            Event::MoneyDeposited { amount } => {
                self.balance = self.balance.add(amount).expect("currency validated at command time");
            }
            Event::MoneyWithdrawn { amount } => {
                self.balance = self
                    .balance
                    .subtract(amount)
                    .expect("currency validated at command time");
            }
            Event::FeeApplied { fee_amount, .. } => {
                self.balance = self
                    .balance
                    .subtract(fee_amount)
                    .expect("currency validated at command time");
            }
            Event::AccountFrozen => self.status = AccountStatus::Frozen,
            Event::AccountUnfrozen => self.status = AccountStatus::Open,
            Event::AccountClosed => self.status = AccountStatus::Closed,
            Event::OverdraftLimitChanged {
                new_overdraft_limit,
            } => self.overdraft_limit = *new_overdraft_limit,
            Event::AccountHolderNameChanged {
                new_account_holder_name,
            } => self.holder_name = new_account_holder_name.clone(),
        }
        self.version += 1;
    }
}

impl Account {
    fn execute_deposit(&self, amount: Money) -> Result<Vec<Event>, BankError> {
        if !matches!(self.status, AccountStatus::Open | AccountStatus::Frozen) {
            return Err(BankError::invalid_state(
                "deposits require an open or frozen account",
            ));
        }
        if !amount.is_positive() {
            return Err(BankError::invalid_argument(
                "deposit amount must be positive",
            ));
        }
        self.require_currency(&amount)?;
        Ok(vec![Event::MoneyDeposited { amount }])
    }

    fn execute_withdraw(&self, amount: Money) -> Result<Vec<Event>, BankError> {
        if self.status != AccountStatus::Open {
            return Err(BankError::invalid_state(
                "withdrawals require an open account",
            ));
        }
        if !amount.is_positive() {
            return Err(BankError::invalid_argument(
                "withdrawal amount must be positive",
            ));
        }
        self.require_currency(&amount)?;
        if self.available_to_withdraw() < amount.amount {
            return Err(BankError::invalid_state(format!(
                "withdrawal of {} exceeds available balance of {}",
                amount.amount,
                self.available_to_withdraw()
            )));
        }
        Ok(vec![Event::MoneyWithdrawn { amount }])
    }

    fn execute_freeze(&self) -> Result<Vec<Event>, BankError> {
        if self.status != AccountStatus::Open {
            return Err(BankError::invalid_state("only an open account can freeze"));
        }
        Ok(vec![Event::AccountFrozen])
    }

    fn execute_unfreeze(&self) -> Result<Vec<Event>, BankError> {
        if self.status != AccountStatus::Frozen {
            return Err(BankError::invalid_state(
                "only a frozen account can unfreeze",
            ));
        }
        Ok(vec![Event::AccountUnfrozen])
    }

    fn execute_close(&self) -> Result<Vec<Event>, BankError> {
        match self.status {
            AccountStatus::Closed => Ok(vec![]),
            AccountStatus::Frozen => Err(BankError::invalid_state(
                "unfreeze first: a frozen account cannot be closed directly",
            )),
            AccountStatus::Open => {
                if !self.balance.amount.is_zero() {
                    return Err(BankError::invalid_state(
                        "account balance must be zero to close",
                    ));
                }
                Ok(vec![Event::AccountClosed])
            }
            AccountStatus::New => Err(BankError::invalid_state("account is not open")),
        }
    }

    fn execute_change_limit(&self, new_limit: Decimal) -> Result<Vec<Event>, BankError> {
        if self.status != AccountStatus::Open {
            return Err(BankError::invalid_state(
                "overdraft limit can only change on an open account",
            ));
        }
        if new_limit.is_sign_negative() {
            return Err(BankError::invalid_argument(
                "overdraft limit must be non-negative",
            ));
        }
        if self.balance.amount.is_sign_negative() && new_limit < -self.balance.amount {
            return Err(BankError::invalid_state(
                "new overdraft limit must cover the current negative balance",
            ));
        }
        if new_limit == self.overdraft_limit {
            return Ok(vec![]);
        }
        Ok(vec![Event::OverdraftLimitChanged {
            new_overdraft_limit: new_limit,
        }])
    }

    fn execute_rename(&self, new_name: String) -> Result<Vec<Event>, BankError> {
        if self.status == AccountStatus::Closed {
            return Err(BankError::invalid_state(
                "a closed account's holder name cannot change",
            ));
        }
        if new_name.trim().is_empty() {
            return Err(BankError::invalid_argument("holder name must not be empty"));
        }
        if new_name == self.holder_name {
            return Ok(vec![]);
        }
        Ok(vec![Event::AccountHolderNameChanged {
            new_account_holder_name: new_name,
        }])
    }

    fn execute_fee(&self, amount: Money, reason: String) -> Result<Vec<Event>, BankError> {
        if self.status == AccountStatus::Closed {
            return Err(BankError::invalid_state(
                "a closed account cannot be charged a fee",
            ));
        }
        if !amount.is_positive() {
            return Err(BankError::invalid_argument("fee amount must be positive"));
        }
        self.require_currency(&amount)?;
        Ok(vec![Event::FeeApplied {
            fee_amount: amount,
            reason,
        }])
    }
}

impl Event {
    fn event_type_name(&self) -> &'static str {
        use crate::event::DomainEvent;
        self.event_type()
    }
}

/// Opaque event metadata the core never interprets; carried verbatim
/// through the store. An empty object by default.
pub fn empty_metadata() -> Json {
    Json::Object(Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CurrencyCode;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    fn money(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, usd())
    }

    fn opened(balance: rust_decimal::Decimal, overdraft: rust_decimal::Decimal) -> Account {
        let (account, _) = Account::open(
            AccountId::new(),
            "Ada Lovelace",
            overdraft,
            money(balance),
            None,
        )
        .unwrap();
        account
    }

    #[test]
    fn open_rejects_blank_holder_name() {
        let err = Account::open(AccountId::new(), "   ", dec!(0), money(dec!(0)), None)
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidArgument { .. }));
    }

    #[test]
    fn open_rejects_nil_id() {
        let nil_id = AccountId(uuid::Uuid::nil());
        let err = Account::open(nil_id, "Ada Lovelace", dec!(0), money(dec!(0)), None)
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidArgument { .. }));
    }

    #[test]
    fn open_sets_version_zero() {
        let account = opened(dec!(100), dec!(0));
        assert_eq!(account.version(), 0);
        assert_eq!(account.status(), AccountStatus::Open);
    }

    #[test]
    fn deposit_then_withdraw_updates_balance_and_version() {
        let mut account = opened(dec!(100), dec!(0));
        let events = account.execute(AccountCommand::Deposit(money(dec!(50)))).unwrap();
        assert_eq!(events.len(), 1);
        account.apply(&events[0]);
        assert_eq!(account.balance(), money(dec!(150)));
        assert_eq!(account.version(), 1);

        let events = account
            .execute(AccountCommand::Withdraw(money(dec!(30))))
            .unwrap();
        account.apply(&events[0]);
        assert_eq!(account.balance(), money(dec!(120)));
        assert_eq!(account.version(), 2);
    }

    #[test]
    fn withdrawal_is_bounded_by_balance_plus_overdraft() {
        let account = opened(dec!(100), dec!(20));
        assert_eq!(account.available_to_withdraw(), dec!(120));
        account
            .execute(AccountCommand::Withdraw(money(dec!(120))))
            .expect("exactly at the overdraft floor is allowed");
        let err = account
            .execute(AccountCommand::Withdraw(money(dec!(120.01))))
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidState { .. }));
    }

    #[test]
    fn closed_account_is_terminal() {
        let mut account = opened(dec!(0), dec!(0));
        for event in account.execute(AccountCommand::Close).unwrap() {
            account.apply(&event);
        }
        assert_eq!(account.status(), AccountStatus::Closed);

        for command in [
            AccountCommand::Deposit(money(dec!(1))),
            AccountCommand::Withdraw(money(dec!(1))),
            AccountCommand::Freeze,
            AccountCommand::ChangeOverdraftLimit(dec!(1)),
            AccountCommand::ChangeAccountHolderName("New Name".into()),
            AccountCommand::ApplyFee {
                amount: money(dec!(1)),
                reason: "test".into(),
            },
        ] {
            let err = account.execute(command).unwrap_err();
            assert!(matches!(err, BankError::InvalidState { .. }));
        }
    }

    #[test]
    fn close_requires_zero_balance() {
        let account = opened(dec!(10), dec!(0));
        let err = account.execute(AccountCommand::Close).unwrap_err();
        assert!(matches!(err, BankError::InvalidState { .. }));
    }

    #[test]
    fn frozen_account_rejects_withdrawals_but_allows_deposits() {
        let mut account = opened(dec!(100), dec!(0));
        for event in account.execute(AccountCommand::Freeze).unwrap() {
            account.apply(&event);
        }
        assert_eq!(account.status(), AccountStatus::Frozen);

        let err = account
            .execute(AccountCommand::Withdraw(money(dec!(10))))
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidState { .. }));

        account
            .execute(AccountCommand::Deposit(money(dec!(10))))
            .expect("deposits are allowed while frozen");
    }

    #[test]
    fn replaying_history_reproduces_identical_state() {
        let (opened_account, open_event) =
            Account::open(AccountId::new(), "Ada Lovelace", dec!(0), money(dec!(100)), None)
                .unwrap();
        let id = opened_account.id;

        let mut live = opened_account;
        let mut history = vec![(0i64, open_event)];

        let deposit = live.execute(AccountCommand::Deposit(money(dec!(50)))).unwrap();
        live.apply(&deposit[0]);
        history.push((1, deposit[0].clone()));

        let withdraw = live
            .execute(AccountCommand::Withdraw(money(dec!(20))))
            .unwrap();
        live.apply(&withdraw[0]);
        history.push((2, withdraw[0].clone()));

        let replayed = Account::from_history(id, &history).unwrap();
        assert_eq!(replayed.balance(), live.balance());
        assert_eq!(replayed.version(), live.version());
        assert_eq!(replayed.status(), live.status());
    }

    #[test]
    fn no_op_commands_emit_no_events() {
        let account = opened(dec!(100), dec!(10));
        assert!(account
            .execute(AccountCommand::ChangeOverdraftLimit(dec!(10)))
            .unwrap()
            .is_empty());
        assert!(account
            .execute(AccountCommand::ChangeAccountHolderName("Ada Lovelace".into()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn currency_mismatch_is_rejected() {
        let account = opened(dec!(100), dec!(0));
        let eur = Money::new(dec!(10), "EUR".parse().unwrap());
        let err = account.execute(AccountCommand::Deposit(eur)).unwrap_err();
        assert!(matches!(err, BankError::CurrencyMismatch { .. }));
    }
}

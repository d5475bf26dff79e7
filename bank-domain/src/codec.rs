//! Event payload codec.
//!
//! Hand-written rather than derived: the persisted `event_type` column is
//! a separate field from the JSON payload body, and decoding must match
//! keys case-insensitively (a store populated by another service, or by
//! a future schema revision with different key casing, must still
//! decode). `serde`'s internally-tagged-enum derive supports neither.

use crate::error::BankError;
use crate::event::AccountEventPayload as Event;
use crate::money::Money;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// Encode a payload to its JSON body. The event type tag is carried
/// alongside this value by the caller (store column, not an embedded
/// key).
pub fn encode(event: &Event) -> Result<Value, BankError> {
    let value = match event {
        Event::BankAccountOpened {
            account_holder,
            overdraft_limit,
            initial_balance,
        } => serde_json::json!({
            "accountHolder": account_holder,
            "overdraftLimit": overdraft_limit,
            "initialBalance": initial_balance,
        }),
        Event::MoneyDeposited { amount } => serde_json::json!({ "amount": amount }),
        Event::MoneyWithdrawn { amount } => serde_json::json!({ "amount": amount }),
        Event::AccountFrozen => Value::Object(Map::new()),
        Event::AccountUnfrozen => Value::Object(Map::new()),
        Event::AccountClosed => Value::Object(Map::new()),
        Event::OverdraftLimitChanged {
            new_overdraft_limit,
        } => serde_json::json!({ "newOverdraftLimit": new_overdraft_limit }),
        Event::AccountHolderNameChanged {
            new_account_holder_name,
        } => serde_json::json!({ "newAccountHolderName": new_account_holder_name }),
        Event::FeeApplied {
            fee_amount,
            reason,
        } => serde_json::json!({ "feeAmount": fee_amount, "reason": reason }),
    };
    Ok(value)
}

/// Decode a payload body given its type tag. Keys are matched
/// case-insensitively; an unrecognized tag or a body missing/
/// mistyping a required field is a [`BankError::Codec`], never a panic.
pub fn decode(event_type: &str, body: &Value) -> Result<Event, BankError> {
    let fields = CaseInsensitiveFields::new(body, event_type)?;
    match event_type {
        Event::BANK_ACCOUNT_OPENED => Ok(Event::BankAccountOpened {
            account_holder: fields.string("accountHolder")?,
            overdraft_limit: fields.decimal("overdraftLimit")?,
            initial_balance: fields.money("initialBalance")?,
        }),
        Event::MONEY_DEPOSITED => Ok(Event::MoneyDeposited {
            amount: fields.money("amount")?,
        }),
        Event::MONEY_WITHDRAWN => Ok(Event::MoneyWithdrawn {
            amount: fields.money("amount")?,
        }),
        Event::ACCOUNT_FROZEN => Ok(Event::AccountFrozen),
        Event::ACCOUNT_UNFROZEN => Ok(Event::AccountUnfrozen),
        Event::ACCOUNT_CLOSED => Ok(Event::AccountClosed),
        Event::OVERDRAFT_LIMIT_CHANGED => Ok(Event::OverdraftLimitChanged {
            new_overdraft_limit: fields.decimal("newOverdraftLimit")?,
        }),
        Event::ACCOUNT_HOLDER_NAME_CHANGED => Ok(Event::AccountHolderNameChanged {
            new_account_holder_name: fields.string("newAccountHolderName")?,
        }),
        Event::FEE_APPLIED => Ok(Event::FeeApplied {
            fee_amount: fields.money("feeAmount")?,
            reason: fields.string("reason")?,
        }),
        other => Err(BankError::codec(format!(
            "unknown event type tag {other:?}; known tags are {:?}",
            Event::ALL_TAGS
        ))),
    }
}

/// A JSON object view whose key lookup ignores case, built once per
/// decode call.
struct CaseInsensitiveFields<'a> {
    by_lower_key: std::collections::HashMap<String, &'a Value>,
    event_type: &'a str,
}

impl<'a> CaseInsensitiveFields<'a> {
    fn new(body: &'a Value, event_type: &'a str) -> Result<Self, BankError> {
        let object = body.as_object().ok_or_else(|| {
            BankError::codec(format!(
                "{event_type} payload must be a JSON object, got {body}"
            ))
        })?;
        let by_lower_key = object
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Ok(Self {
            by_lower_key,
            event_type,
        })
    }

    fn get(&self, key: &str) -> Result<&'a Value, BankError> {
        self.by_lower_key
            .get(&key.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| {
                BankError::codec(format!(
                    "{} payload missing field {key:?}",
                    self.event_type
                ))
            })
    }

    fn string(&self, key: &str) -> Result<String, BankError> {
        self.get(key)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| self.type_error(key, "a string"))
    }

    fn decimal(&self, key: &str) -> Result<Decimal, BankError> {
        let value = self.get(key)?;
        if let Some(s) = value.as_str() {
            return s
                .parse::<Decimal>()
                .map_err(|e| BankError::codec(format!("{key} is not a decimal: {e}")));
        }
        serde_json::from_value(value.clone())
            .map_err(|_| self.type_error(key, "a decimal number or string"))
    }

    fn money(&self, key: &str) -> Result<Money, BankError> {
        let value = self.get(key)?;
        serde_json::from_value(value.clone()).map_err(|_| self.type_error(key, "a Money object"))
    }

    fn type_error(&self, key: &str, expected: &str) -> BankError {
        BankError::codec(format!(
            "{} field {key:?} must be {expected}",
            self.event_type
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::CurrencyCode;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    #[test]
    fn round_trips_every_variant() {
        let events = vec![
            Event::BankAccountOpened {
                account_holder: "Ada Lovelace".into(),
                overdraft_limit: dec!(100),
                initial_balance: Money::new(dec!(50), usd()),
            },
            Event::MoneyDeposited {
                amount: Money::new(dec!(25), usd()),
            },
            Event::MoneyWithdrawn {
                amount: Money::new(dec!(10), usd()),
            },
            Event::AccountFrozen,
            Event::AccountUnfrozen,
            Event::AccountClosed,
            Event::OverdraftLimitChanged {
                new_overdraft_limit: dec!(200),
            },
            Event::AccountHolderNameChanged {
                new_account_holder_name: "Grace Hopper".into(),
            },
            Event::FeeApplied {
                fee_amount: Money::new(dec!(5), usd()),
                reason: "monthly maintenance".into(),
            },
        ];
        for event in events {
            let tag = {
                use crate::event::DomainEvent;
                event.event_type()
            };
            let body = encode(&event).unwrap();
            let decoded = decode(tag, &body).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn decode_is_case_insensitive_on_keys() {
        let body = serde_json::json!({ "AMOUNT": { "amount": "25", "currency": "USD" } });
        let decoded = decode(Event::MONEY_DEPOSITED, &body).unwrap();
        assert_eq!(
            decoded,
            Event::MoneyDeposited {
                amount: Money::new(dec!(25), usd())
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_tag() {
        let err = decode("SomeFutureEvent", &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, BankError::Codec { .. }));
    }

    #[test]
    fn decode_rejects_missing_field() {
        let err = decode(Event::MONEY_DEPOSITED, &serde_json::json!({})).unwrap_err();
        assert!(matches!(err, BankError::Codec { .. }));
    }
}

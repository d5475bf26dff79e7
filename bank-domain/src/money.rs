//! Currency-tagged fixed-precision amounts.
//!
//! `Money` never uses binary floating point: `amount` is a
//! [`rust_decimal::Decimal`], which preserves the operand's scale through
//! addition and subtraction instead of silently truncating it.

use crate::error::BankError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ISO-4217-shaped currency token: exactly three uppercase ASCII
/// letters. The core treats it as opaque beyond that shape check — no
/// currency table, no conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("CurrencyCode is always valid ASCII")
    }
}

impl FromStr for CurrencyCode {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(BankError::invalid_argument(format!(
                "currency must be 3 uppercase ASCII letters, got {s:?}"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A currency-tagged decimal amount. Equality and ordering are by
/// `(amount, currency)`; comparing across currencies is a logic error, so
/// `Money` intentionally does not implement `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_sign_positive() && !self.amount.is_zero()
    }

    /// Add two amounts of the same currency.
    pub fn add(&self, other: &Money) -> Result<Money, BankError> {
        self.check_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency))
    }

    /// Subtract `other` from `self`, both in the same currency.
    pub fn subtract(&self, other: &Money) -> Result<Money, BankError> {
        self.check_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    fn check_currency(&self, other: &Money) -> Result<(), BankError> {
        if self.currency != other.currency {
            return Err(BankError::currency_mismatch(self.currency, other.currency));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        "USD".parse().unwrap()
    }

    fn eur() -> CurrencyCode {
        "EUR".parse().unwrap()
    }

    #[test]
    fn add_same_currency() {
        let a = Money::new(dec!(10.00), usd());
        let b = Money::new(dec!(5.50), usd());
        assert_eq!(a.add(&b).unwrap(), Money::new(dec!(15.50), usd()));
    }

    #[test]
    fn subtract_same_currency() {
        let a = Money::new(dec!(10.00), usd());
        let b = Money::new(dec!(3.25), usd());
        assert_eq!(a.subtract(&b).unwrap(), Money::new(dec!(6.75), usd()));
    }

    #[test]
    fn add_mismatched_currency_fails() {
        let a = Money::new(dec!(10.00), usd());
        let b = Money::new(dec!(5.00), eur());
        let err = a.add(&b).unwrap_err();
        assert!(matches!(err, BankError::CurrencyMismatch { .. }));
    }

    #[test]
    fn currency_code_rejects_malformed_input() {
        assert!("usd".parse::<CurrencyCode>().is_err());
        assert!("US".parse::<CurrencyCode>().is_err());
        assert!("USDD".parse::<CurrencyCode>().is_err());
        assert!("USD".parse::<CurrencyCode>().is_ok());
    }

    #[test]
    fn subtraction_preserves_scale() {
        let a = Money::new(dec!(10.00), usd());
        let b = Money::new(dec!(0.001), usd());
        let result = a.subtract(&b).unwrap();
        assert_eq!(result.amount, dec!(9.999));
    }
}

//! Fixed-point monetary amounts.
//!
//! Amounts are `rust_decimal::Decimal`, never binary floating point, so
//! repeated renewals cannot drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// ISO-4217 style currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parses a three-letter code; case-insensitive.
    pub fn new(code: impl AsRef<str>) -> Result<Self, ValidationError> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("expected a three-letter code, got '{}'", code),
            ));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative amount in a given currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    /// Creates a money value, rejecting negative amounts.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("amount must not be negative, got {}", amount),
            ));
        }
        Ok(Self { amount, currency })
    }

    /// Parses the textual form of an amount (e.g. `"5.75"`).
    ///
    /// `field` names the payload path reported on failure.
    pub fn parse(field: &str, amount: &str, currency: Currency) -> Result<Self, ValidationError> {
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(ValidationError::empty_field(field));
        }
        let decimal = Decimal::from_str(amount)
            .map_err(|e| ValidationError::invalid_format(field, e.to_string()))?;
        Self::new(decimal, currency).map_err(|e| match e {
            ValidationError::InvalidFormat { reason, .. } => {
                ValidationError::invalid_format(field, reason)
            }
            other => other,
        })
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

//! Strongly-typed identifier value objects.
//!
//! Every external key the engine handles is a string chosen by someone else
//! (the payment provider or the account service), so identifiers wrap a
//! non-empty, trimmed `String` rather than a UUID.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates the identifier, rejecting blank input.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                if trimmed.len() == id.len() {
                    Ok(Self(id))
                } else {
                    Ok(Self(trimmed.to_string()))
                }
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Internal identifier of a user account.
    UserId,
    "user_id"
);

string_id!(
    /// The provider's identifier for a recurring-payment mandate.
    BillingAgreementId,
    "billing_agreement_id"
);

string_id!(
    /// Provider payment/sale id. The dedup key for renewals.
    TransactionId,
    "transaction_id"
);

//! Business outcome of applying a payment event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What `apply` did. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The snapshot changed.
    Applied,
    /// The transaction was already applied.
    Duplicate,
    /// Unknown event kind.
    Ignored,
    /// Nothing to change (e.g. reactivating a subscription that is not suspended).
    NoOp,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Duplicate => "duplicate",
            Outcome::Ignored => "ignored",
            Outcome::NoOp => "no_op",
        }
    }

    /// Only an applied outcome needs a snapshot write.
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

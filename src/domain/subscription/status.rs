//! Subscription status state machine.
//!
//! `None → Active → {Suspended, Cancelled, Expired} → Active (re-subscription)`

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription status as written by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Account exists, never paid.
    #[default]
    None,

    /// Paid and in good standing.
    Active,

    /// Provider reported a failed charge. Access is gated immediately.
    Suspended,

    /// Recurring mandate cancelled. Access continues until `expires_at`.
    Cancelled,

    /// Provider reported the subscription ended.
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Statuses under which an unexpired period still grants access.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Cancelled)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // A payment activates from any state
            (_, Active)
            // From ACTIVE
                | (Active, Suspended)
                | (Active, Cancelled)
                | (Active, Expired)
            // From SUSPENDED
                | (Suspended, Cancelled)
                | (Suspended, Expired)
            // From CANCELLED
                | (Cancelled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            None => vec![Active],
            Active => vec![Active, Suspended, Cancelled, Expired],
            Suspended => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active, Expired],
            Expired => vec![Active],
        }
    }
}

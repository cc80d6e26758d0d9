//! Subscription snapshot - one per user.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::domain::foundation::{BillingAgreementId, Timestamp, TransactionId, UserId};

use super::SubscriptionStatus;

/// Recently applied transaction ids, oldest first.
///
/// Bounded: recording beyond `capacity` evicts the oldest id. The window
/// only needs to cover realistic redelivery delays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedTransactions(VecDeque<TransactionId>);

impl ProcessedTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.0.contains(id)
    }

    /// Appends `id`, evicting the oldest ids beyond `capacity`.
    pub fn record(&mut self, id: TransactionId, capacity: usize) {
        if self.contains(&id) {
            return;
        }
        self.0.push_back(id);
        while self.0.len() > capacity {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransactionId> {
        self.0.iter()
    }
}

/// A user's paid-entitlement state.
///
/// Mutated only through `SubscriptionStateMachine::apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub user_id: UserId,
    #[serde(default)]
    pub billing_agreement_id: Option<BillingAgreementId>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub processed_transaction_ids: ProcessedTransactions,
    /// Latest provider-reported time of any applied event.
    #[serde(default)]
    pub last_event_at: Option<Timestamp>,
}

impl SubscriptionSnapshot {
    /// Fresh snapshot for a new account.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            billing_agreement_id: None,
            is_active: false,
            expires_at: None,
            status: SubscriptionStatus::None,
            processed_transaction_ids: ProcessedTransactions::new(),
            last_event_at: None,
        }
    }

    /// Entitlement derived lazily at read time.
    ///
    /// Expiry is never written by the passage of time; a period that has
    /// run out simply stops entitling here.
    pub fn entitlement(&self, now: Timestamp) -> Entitlement {
        let access_until = self
            .expires_at
            .filter(|expires_at| now.is_before(expires_at))
            .filter(|_| self.is_active && self.status.grants_access());

        Entitlement {
            entitled: access_until.is_some(),
            access_until,
        }
    }
}

/// Whether a user currently has paid access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub entitled: bool,
    pub access_until: Option<Timestamp>,
}

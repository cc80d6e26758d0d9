//! Entitlement ledgers and the agreement-history index.

use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::domain::foundation::{BillingAgreementId, UserId, ValidationError};
use crate::domain::subscription::SubscriptionSnapshot;

/// A set of snapshots keyed and ordered by user id.
///
/// Serialized as a JSON array of snapshots; a user may appear only once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SubscriptionSnapshot>", into = "Vec<SubscriptionSnapshot>")]
pub struct Ledger {
    entries: BTreeMap<UserId, SubscriptionSnapshot>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger, rejecting duplicate user ids.
    pub fn from_snapshots(
        snapshots: impl IntoIterator<Item = SubscriptionSnapshot>,
    ) -> Result<Self, ValidationError> {
        let mut ledger = Self::new();
        for snapshot in snapshots {
            let user_id = snapshot.user_id.clone();
            if ledger.insert(snapshot).is_some() {
                return Err(ValidationError::invalid_format(
                    "user_id",
                    format!("duplicate ledger entry for {}", user_id),
                ));
            }
        }
        Ok(ledger)
    }

    /// Inserts or replaces the snapshot for its user.
    pub fn insert(&mut self, snapshot: SubscriptionSnapshot) -> Option<SubscriptionSnapshot> {
        self.entries.insert(snapshot.user_id.clone(), snapshot)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&SubscriptionSnapshot> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in user-id order.
    pub fn iter(&self) -> btree_map::Iter<'_, UserId, SubscriptionSnapshot> {
        self.entries.iter()
    }
}

impl TryFrom<Vec<SubscriptionSnapshot>> for Ledger {
    type Error = ValidationError;

    fn try_from(snapshots: Vec<SubscriptionSnapshot>) -> Result<Self, Self::Error> {
        Self::from_snapshots(snapshots)
    }
}

impl From<Ledger> for Vec<SubscriptionSnapshot> {
    fn from(ledger: Ledger) -> Self {
        ledger.entries.into_values().collect()
    }
}

/// Every billing agreement id each user has ever held.
///
/// Serialized as `{"<user_id>": ["<agreement_id>", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgreementHistory {
    agreements: BTreeMap<UserId, BTreeSet<BillingAgreementId>>,
}

impl AgreementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, user_id: UserId, agreement_id: BillingAgreementId) {
        self.agreements.entry(user_id).or_default().insert(agreement_id);
    }

    /// Ids on file for `user_id`, or `None` when the index has no entry.
    pub fn agreements_for(&self, user_id: &UserId) -> Option<&BTreeSet<BillingAgreementId>> {
        self.agreements.get(user_id)
    }

    /// `None` when the user is not indexed, so nothing can be concluded.
    pub fn knows(&self, user_id: &UserId, agreement_id: &BillingAgreementId) -> Option<bool> {
        self.agreements_for(user_id)
            .map(|agreements| agreements.contains(agreement_id))
    }

    /// The user who held `agreement_id`, if exactly one did.
    pub fn holder_of(&self, agreement_id: &BillingAgreementId) -> Option<&UserId> {
        let mut holders = self
            .agreements
            .iter()
            .filter(|(_, agreements)| agreements.contains(agreement_id))
            .map(|(user_id, _)| user_id);
        match (holders.next(), holders.next()) {
            (Some(user_id), None) => Some(user_id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
    }
}

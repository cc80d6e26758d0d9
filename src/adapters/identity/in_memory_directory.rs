//! In-memory identity directory.
//!
//! Holds the three indexes the resolver consults: current agreement id per
//! user, the set of known users, and every agreement id a user ever held.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use crate::domain::foundation::{BillingAgreementId, DomainError, UserId};
use crate::domain::reconciliation::AgreementHistory;
use crate::ports::{IdentityIndex, IdentityLookup};

#[derive(Debug, Default)]
struct Directory {
    users: HashSet<UserId>,
    current: HashMap<BillingAgreementId, UserId>,
    current_by_user: HashMap<UserId, BillingAgreementId>,
    history: AgreementHistory,
}

/// In-memory `IdentityLookup` for tests and single-node embeddings.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    inner: RwLock<Directory>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with no agreement yet.
    pub async fn register_user(&self, user_id: UserId) {
        self.inner.write().await.users.insert(user_id);
    }

    /// Makes `agreement_id` the user's current agreement.
    ///
    /// The previous current agreement stays in the user's history.
    pub async fn link_agreement(&self, user_id: UserId, agreement_id: BillingAgreementId) {
        let mut dir = self.inner.write().await;
        dir.users.insert(user_id.clone());
        if let Some(previous) = dir.current_by_user.remove(&user_id) {
            dir.current.remove(&previous);
        }
        dir.history.record(user_id.clone(), agreement_id.clone());
        if let Some(other) = dir.current.insert(agreement_id.clone(), user_id.clone()) {
            if other != user_id {
                dir.current_by_user.remove(&other);
            }
        }
        dir.current_by_user.insert(user_id, agreement_id);
    }

    /// Copy of the agreement-history index, for reconciliation.
    pub async fn agreement_history(&self) -> AgreementHistory {
        self.inner.read().await.history.clone()
    }
}

#[async_trait]
impl IdentityLookup for InMemoryIdentityDirectory {
    async fn find_by_billing_agreement_id(
        &self,
        id: &BillingAgreementId,
    ) -> Result<Option<UserId>, DomainError> {
        Ok(self.inner.read().await.current.get(id).cloned())
    }

    async fn find_by_user_id(&self, id: &UserId) -> Result<Option<UserId>, DomainError> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_by_historical_agreement_id(
        &self,
        id: &BillingAgreementId,
    ) -> Result<Option<UserId>, DomainError> {
        Ok(self.inner.read().await.history.holder_of(id).cloned())
    }
}

#[async_trait]
impl IdentityIndex for InMemoryIdentityDirectory {
    async fn record_current_agreement(
        &self,
        user_id: &UserId,
        agreement_id: &BillingAgreementId,
    ) -> Result<(), DomainError> {
        let unchanged = self
            .inner
            .read()
            .await
            .current_by_user
            .get(user_id)
            .map_or(false, |current| current == agreement_id);
        if !unchanged {
            self.link_agreement(user_id.clone(), agreement_id.clone()).await;
        }
        Ok(())
    }
}

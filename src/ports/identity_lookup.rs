//! IdentityLookup port - read-only identity queries.
//!
//! The only way the engine turns a provider's keys into an internal user id.
//! Implementations own the indexes (current agreement id, user table,
//! historical agreement ids); the resolver owns the order they are consulted in.

use async_trait::async_trait;

use crate::domain::foundation::{BillingAgreementId, DomainError, UserId};

/// Port for resolving provider keys to users.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// User whose *current* billing agreement id equals `id`.
    async fn find_by_billing_agreement_id(
        &self,
        id: &BillingAgreementId,
    ) -> Result<Option<UserId>, DomainError>;

    /// The user with this internal id, if the account exists.
    async fn find_by_user_id(&self, id: &UserId) -> Result<Option<UserId>, DomainError>;

    /// User who held `id` at some point before their current agreement.
    async fn find_by_historical_agreement_id(
        &self,
        id: &BillingAgreementId,
    ) -> Result<Option<UserId>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_lookup_is_object_safe() {
        fn _accepts_dyn(_lookup: &dyn IdentityLookup) {}
    }
}

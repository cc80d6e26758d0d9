//! IdentityIndex port - keeps the current-agreement index in step with
//! the snapshots the engine writes.

use async_trait::async_trait;

use crate::domain::foundation::{BillingAgreementId, DomainError, UserId};

/// Write side of the identity indexes behind `IdentityLookup`.
#[async_trait]
pub trait IdentityIndex: Send + Sync {
    /// Makes `agreement_id` the user's current agreement. The previous one
    /// moves to the user's history. Recording the same pair again is a no-op.
    async fn record_current_agreement(
        &self,
        user_id: &UserId,
        agreement_id: &BillingAgreementId,
    ) -> Result<(), DomainError>;
}

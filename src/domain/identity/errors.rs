//! Identity resolution errors.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentEvent;

/// Why no user could be attached to a payment event.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// No strategy matched. Goes to the operator queue, never guessed.
    #[error("Unresolvable payment event {event_id} (agreement: {billing_agreement_id:?}, custom: {custom_user_id:?})")]
    Unresolvable {
        event_id: String,
        billing_agreement_id: Option<String>,
        custom_user_id: Option<String>,
    },

    /// The identity lookup itself failed.
    #[error("Identity lookup failed: {0}")]
    LookupFailed(#[from] DomainError),
}

impl ResolutionError {
    /// Captures the keys that were tried, for the operator.
    pub fn unresolvable(event: &PaymentEvent) -> Self {
        ResolutionError::Unresolvable {
            event_id: event.event_id.to_string(),
            billing_agreement_id: event.billing_agreement_id.as_ref().map(|id| id.to_string()),
            custom_user_id: event.custom_user_id.as_ref().map(|id| id.to_string()),
        }
    }
}

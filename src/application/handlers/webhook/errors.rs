//! Webhook error types.
//!
//! Every failure of the webhook path, with the disposition the transport
//! layer should apply. Business outcomes (`Duplicate`, `Ignored`, `NoOp`)
//! are not errors and never appear here.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::domain::identity::ResolutionError;
use crate::domain::payment::NormalizationError;
use crate::ports::LockError;

/// What the transport should do with a failed webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookDisposition {
    /// Answer with a client error; the provider redelivers.
    Reject,
    /// Transient; retry with backoff. Idempotency makes this safe.
    Retry,
    /// Nobody could be matched; an operator has to look the user up.
    OperatorQueue,
}

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Malformed payload.
    #[error("Malformed payment event: {0}")]
    Normalization(#[from] NormalizationError),

    /// No user matched, or the lookup failed.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The user's critical section could not be entered in time.
    #[error("Concurrency conflict on user {user_id}")]
    ConcurrencyConflict { user_id: String },

    /// The lock backend failed.
    #[error("Lock unavailable: {0}")]
    LockUnavailable(String),

    /// Snapshot read or write failed.
    #[error("Snapshot store error: {0}")]
    Store(DomainError),
}

impl From<LockError> for WebhookError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout { user_id } => WebhookError::ConcurrencyConflict { user_id },
            LockError::Unavailable(message) => WebhookError::LockUnavailable(message),
        }
    }
}

impl WebhookError {
    /// Returns true if retrying the same delivery may succeed.
    pub fn is_retryable(&self) -> bool {
        self.disposition() == WebhookDisposition::Retry
    }

    pub fn disposition(&self) -> WebhookDisposition {
        match self {
            WebhookError::Normalization(_) => WebhookDisposition::Reject,
            WebhookError::Resolution(ResolutionError::Unresolvable { .. }) => {
                WebhookDisposition::OperatorQueue
            }
            WebhookError::Resolution(ResolutionError::LookupFailed(_))
            | WebhookError::ConcurrencyConflict { .. }
            | WebhookError::LockUnavailable(_)
            | WebhookError::Store(_) => WebhookDisposition::Retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_payload_is_rejected_not_retried() {
        let err = WebhookError::from(NormalizationError::missing("resource.id"));

        assert_eq!(err.disposition(), WebhookDisposition::Reject);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Malformed payment event: Missing field: resource.id");
    }

    #[test]
    fn unresolvable_goes_to_operator_queue() {
        let err = WebhookError::from(ResolutionError::Unresolvable {
            event_id: "WH-1".to_string(),
            billing_agreement_id: None,
            custom_user_id: None,
        });

        assert_eq!(err.disposition(), WebhookDisposition::OperatorQueue);
        assert!(!err.is_retryable());
    }

    #[test]
    fn lookup_failure_is_retryable() {
        let err = WebhookError::from(ResolutionError::LookupFailed(DomainError::database("down")));
        assert!(err.is_retryable());
    }

    #[test]
    fn lock_timeout_becomes_concurrency_conflict() {
        let err = WebhookError::from(LockError::Timeout {
            user_id: "u-1".to_string(),
        });

        assert!(matches!(err, WebhookError::ConcurrencyConflict { ref user_id } if user_id == "u-1"));
        assert!(err.is_retryable());
    }

    #[test]
    fn store_failure_is_retryable() {
        assert!(WebhookError::Store(DomainError::database("write failed")).is_retryable());
    }
}

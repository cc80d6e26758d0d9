//! Canonical payment event.
//!
//! Whatever the provider sends is reduced to this shape by the normalizer
//! before anything else in the engine looks at it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    BillingAgreementId, EventId, Money, Timestamp, TransactionId, UserId,
};

/// The kinds of provider notification the engine understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    /// A recurring charge succeeded.
    SaleCompleted,
    /// The recurring mandate was cancelled.
    SubscriptionCancelled,
    /// The provider suspended the mandate (failed charge).
    SubscriptionSuspended,
    /// A suspended mandate was re-activated.
    SubscriptionActivated,
    /// The provider reports the subscription ended.
    SubscriptionExpired,
    /// Anything else. The raw provider type is kept for logging.
    Unknown(String),
}

impl PaymentEventKind {
    /// Maps a provider `event_type` string. Never fails.
    pub fn from_provider_type(event_type: &str) -> Self {
        match event_type.trim().to_ascii_uppercase().as_str() {
            "PAYMENT.SALE.COMPLETED" => Self::SaleCompleted,
            "BILLING.SUBSCRIPTION.CANCELLED" => Self::SubscriptionCancelled,
            "BILLING.SUBSCRIPTION.SUSPENDED" => Self::SubscriptionSuspended,
            "BILLING.SUBSCRIPTION.ACTIVATED" | "BILLING.SUBSCRIPTION.RE-ACTIVATED" => {
                Self::SubscriptionActivated
            }
            "BILLING.SUBSCRIPTION.EXPIRED" => Self::SubscriptionExpired,
            _ => Self::Unknown(event_type.to_string()),
        }
    }

    /// Short name used in logs and metrics labels.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SaleCompleted => "sale_completed",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::SubscriptionSuspended => "subscription_suspended",
            Self::SubscriptionActivated => "subscription_activated",
            Self::SubscriptionExpired => "subscription_expired",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Lifecycle events change status without moving money.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::SubscriptionCancelled
                | Self::SubscriptionSuspended
                | Self::SubscriptionActivated
                | Self::SubscriptionExpired
        )
    }
}

impl fmt::Display for PaymentEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where an event came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EventOrigin {
    /// Delivered by the payment provider.
    Provider,
    /// Synthesised by the reconciliation repair workflow.
    Repair { reason: String },
}

/// Canonical, immutable payment event.
///
/// `occurred_at` is provider-reported and is never assumed monotonic across
/// events. `event_id` identifies a delivery, not a payment: redeliveries can
/// carry a new wrapper id for the same `transaction_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub event_id: EventId,
    pub kind: PaymentEventKind,
    pub billing_agreement_id: Option<BillingAgreementId>,
    pub custom_user_id: Option<UserId>,
    /// Present on every `SaleCompleted` from the provider.
    pub amount: Option<Money>,
    pub occurred_at: Timestamp,
    pub transaction_id: TransactionId,
    pub origin: EventOrigin,
}

impl PaymentEvent {
    /// Synthetic renewal used by manual repairs.
    ///
    /// The transaction id must be deterministic for the repair it describes,
    /// so replaying the same repair twice is caught by deduplication.
    pub fn repair_renewal(
        user_id: UserId,
        billing_agreement_id: Option<BillingAgreementId>,
        transaction_id: TransactionId,
        occurred_at: Timestamp,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            kind: PaymentEventKind::SaleCompleted,
            billing_agreement_id,
            custom_user_id: Some(user_id),
            amount: None,
            occurred_at,
            transaction_id,
            origin: EventOrigin::Repair {
                reason: reason.into(),
            },
        }
    }

    pub fn is_repair(&self) -> bool {
        matches!(self.origin, EventOrigin::Repair { .. })
    }
}

/// Builder for creating test PaymentEvent instances.
#[cfg(test)]
pub struct PaymentEventBuilder {
    event: PaymentEvent,
}

#[cfg(test)]
impl PaymentEventBuilder {
    pub fn sale(transaction_id: &str) -> Self {
        use crate::domain::foundation::Currency;
        Self {
            event: PaymentEvent {
                event_id: EventId::from_string(format!("WH-{}", transaction_id)),
                kind: PaymentEventKind::SaleCompleted,
                billing_agreement_id: Some(BillingAgreementId::new("I-AGR").unwrap()),
                custom_user_id: None,
                amount: Some(Money::parse("total", "5.75", Currency::new("CHF").unwrap()).unwrap()),
                occurred_at: Timestamp::now(),
                transaction_id: TransactionId::new(transaction_id).unwrap(),
                origin: EventOrigin::Provider,
            },
        }
    }

    pub fn lifecycle(kind: PaymentEventKind) -> Self {
        let mut builder = Self::sale("I-AGR");
        builder.event.event_id = EventId::new();
        builder.event.kind = kind;
        builder.event.amount = None;
        builder
    }

    pub fn agreement(mut self, id: &str) -> Self {
        self.event.billing_agreement_id = Some(BillingAgreementId::new(id).unwrap());
        self
    }

    pub fn no_agreement(mut self) -> Self {
        self.event.billing_agreement_id = None;
        self
    }

    pub fn custom_user(mut self, id: &str) -> Self {
        self.event.custom_user_id = Some(UserId::new(id).unwrap());
        self
    }

    pub fn occurred_at(mut self, at: Timestamp) -> Self {
        self.event.occurred_at = at;
        self
    }

    pub fn event_id(mut self, id: &str) -> Self {
        self.event.event_id = EventId::from_string(id);
        self
    }

    pub fn build(self) -> PaymentEvent {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_types_map_to_kinds() {
        assert_eq!(
            PaymentEventKind::from_provider_type("PAYMENT.SALE.COMPLETED"),
            PaymentEventKind::SaleCompleted
        );
        assert_eq!(
            PaymentEventKind::from_provider_type("billing.subscription.cancelled"),
            PaymentEventKind::SubscriptionCancelled
        );
        assert_eq!(
            PaymentEventKind::from_provider_type("BILLING.SUBSCRIPTION.RE-ACTIVATED"),
            PaymentEventKind::SubscriptionActivated
        );
        assert_eq!(
            PaymentEventKind::from_provider_type("BILLING.SUBSCRIPTION.EXPIRED"),
            PaymentEventKind::SubscriptionExpired
        );
    }

    #[test]
    fn unrecognised_types_are_kept_as_unknown() {
        let kind = PaymentEventKind::from_provider_type("PAYMENT.SALE.REFUNDED");
        assert_eq!(kind, PaymentEventKind::Unknown("PAYMENT.SALE.REFUNDED".to_string()));
        assert_eq!(kind.as_str(), "unknown");
        assert!(!kind.is_lifecycle());
    }

    #[test]
    fn repair_renewal_is_a_sale_without_amount() {
        let event = PaymentEvent::repair_renewal(
            UserId::new("u-1").unwrap(),
            None,
            TransactionId::new("repair:u-1:1").unwrap(),
            Timestamp::now(),
            "missing renewal",
        );

        assert_eq!(event.kind, PaymentEventKind::SaleCompleted);
        assert!(event.is_repair());
        assert!(event.amount.is_none());
        assert_eq!(event.custom_user_id.as_ref().map(|u| u.as_str()), Some("u-1"));
    }
}

//! Subscription domain events.
//!
//! Side-effect instructions produced by the state machine. The webhook
//! handler publishes them after the snapshot write commits; notification
//! delivery and audit consumers subscribe downstream.
//!
//! Event ids are derived from the payment event that caused them, so a
//! republish after a crash carries the same id and consumers can dedupe.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainEvent, EventId, Timestamp, TransactionId, UserId};

/// Events emitted by subscription transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubscriptionEvent {
    /// A payment extended the paid period.
    ///
    /// Trigger: `SaleCompleted`, live or repair replay
    Renewed {
        user_id: UserId,
        source_event_id: EventId,
        transaction_id: TransactionId,
        previous_expires_at: Option<Timestamp>,
        expires_at: Timestamp,
        repair: bool,
        occurred_at: Timestamp,
    },

    /// Mandate cancelled; access runs until `access_until`.
    Cancelled {
        user_id: UserId,
        source_event_id: EventId,
        access_until: Option<Timestamp>,
        occurred_at: Timestamp,
    },

    /// Failed charge; access revoked.
    Suspended {
        user_id: UserId,
        source_event_id: EventId,
        occurred_at: Timestamp,
    },

    /// Suspended mandate active again.
    Reactivated {
        user_id: UserId,
        source_event_id: EventId,
        occurred_at: Timestamp,
    },

    /// Provider reported the subscription ended.
    Expired {
        user_id: UserId,
        source_event_id: EventId,
        occurred_at: Timestamp,
    },
}

impl SubscriptionEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            SubscriptionEvent::Renewed { user_id, .. }
            | SubscriptionEvent::Cancelled { user_id, .. }
            | SubscriptionEvent::Suspended { user_id, .. }
            | SubscriptionEvent::Reactivated { user_id, .. }
            | SubscriptionEvent::Expired { user_id, .. } => user_id,
        }
    }

    /// The payment event this was derived from.
    pub fn source_event_id(&self) -> &EventId {
        match self {
            SubscriptionEvent::Renewed { source_event_id, .. }
            | SubscriptionEvent::Cancelled { source_event_id, .. }
            | SubscriptionEvent::Suspended { source_event_id, .. }
            | SubscriptionEvent::Reactivated { source_event_id, .. }
            | SubscriptionEvent::Expired { source_event_id, .. } => source_event_id,
        }
    }
}

impl DomainEvent for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SubscriptionEvent::Renewed { .. } => "subscription.renewed.v1",
            SubscriptionEvent::Cancelled { .. } => "subscription.cancelled.v1",
            SubscriptionEvent::Suspended { .. } => "subscription.suspended.v1",
            SubscriptionEvent::Reactivated { .. } => "subscription.reactivated.v1",
            SubscriptionEvent::Expired { .. } => "subscription.expired.v1",
        }
    }

    fn aggregate_id(&self) -> String {
        self.user_id().to_string()
    }

    fn aggregate_type(&self) -> &'static str {
        "Subscription"
    }

    fn occurred_at(&self) -> Timestamp {
        match self {
            SubscriptionEvent::Renewed { occurred_at, .. }
            | SubscriptionEvent::Cancelled { occurred_at, .. }
            | SubscriptionEvent::Suspended { occurred_at, .. }
            | SubscriptionEvent::Reactivated { occurred_at, .. }
            | SubscriptionEvent::Expired { occurred_at, .. } => *occurred_at,
        }
    }

    fn event_id(&self) -> EventId {
        EventId::from_string(format!(
            "{}:{}",
            self.source_event_id(),
            self.event_type()
        ))
    }
}

//! Subscription state machine.
//!
//! `apply` is total: every well-formed `PaymentEvent` yields a `Transition`,
//! business outcomes included. It never reads the clock; callers pass `now`.
//!
//! # Rules
//!
//! - **Dedup**: a `SaleCompleted` whose transaction id was already applied
//!   is a `Duplicate` and leaves the snapshot untouched.
//! - **Renewal**: `expires_at = max(now, expires_at) + one period`. Lapsed
//!   subscriptions restart from `now`; paid-ahead ones stack.
//! - **Cancel** keeps `is_active` and `expires_at`; the paid period is honoured.
//! - **Suspend** revokes `is_active` immediately.
//! - **Activate** only lifts a suspension; it never extends the period.
//! - **Expire** records the provider's end-of-subscription notice.
//!
//! Late events (provider time before `last_event_at`) are applied like any
//! other; `last_event_at` never moves backwards.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, Timestamp};
use crate::domain::payment::{PaymentEvent, PaymentEventKind};

use super::{Outcome, SubscriptionEvent, SubscriptionSnapshot, SubscriptionStatus};

/// Default retained transaction ids per user.
pub const DEFAULT_DEDUP_CAPACITY: usize = 50;

/// Billing rules the machine applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPolicy {
    /// Calendar months added per renewal.
    pub period_months: u32,
    /// Size of the per-user dedup window.
    pub dedup_capacity: usize,
}

impl BillingPolicy {
    /// The nominal length of one period, for comparisons that need a
    /// fixed duration (reconciliation thresholds).
    /// Saturates at `Duration::MAX`.
    pub fn nominal_period(&self) -> Duration {
        Duration::try_days(30 * i64::from(self.period_months)).unwrap_or(Duration::MAX)
    }
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            period_months: 1,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

/// Result of applying one event to one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub snapshot: SubscriptionSnapshot,
    pub outcome: Outcome,
    /// Side effects to publish once `snapshot` is persisted.
    pub effects: Vec<SubscriptionEvent>,
}

impl Transition {
    fn unchanged(snapshot: &SubscriptionSnapshot, outcome: Outcome) -> Self {
        Self {
            snapshot: snapshot.clone(),
            outcome,
            effects: Vec::new(),
        }
    }

    fn applied(snapshot: SubscriptionSnapshot, effect: SubscriptionEvent) -> Self {
        Self {
            snapshot,
            outcome: Outcome::Applied,
            effects: vec![effect],
        }
    }
}

/// Computes next snapshots from payment events.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionStateMachine {
    policy: BillingPolicy,
}

impl SubscriptionStateMachine {
    pub fn new(policy: BillingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BillingPolicy {
        &self.policy
    }

    /// Applies `event` to `snapshot` at processing time `now`.
    pub fn apply(
        &self,
        snapshot: &SubscriptionSnapshot,
        event: &PaymentEvent,
        now: Timestamp,
    ) -> Transition {
        let late = snapshot
            .last_event_at
            .map_or(false, |last| event.occurred_at.is_before(&last));
        if late {
            tracing::warn!(
                user_id = %snapshot.user_id,
                event_id = %event.event_id,
                kind = %event.kind,
                occurred_at = %event.occurred_at,
                "Applying out-of-order payment event"
            );
        }

        match &event.kind {
            PaymentEventKind::SaleCompleted => self.renew(snapshot, event, now),
            PaymentEventKind::SubscriptionCancelled => {
                self.change_status(snapshot, event, now, SubscriptionStatus::Cancelled)
            }
            PaymentEventKind::SubscriptionSuspended => {
                self.change_status(snapshot, event, now, SubscriptionStatus::Suspended)
            }
            PaymentEventKind::SubscriptionActivated => self.reactivate(snapshot, event, now),
            PaymentEventKind::SubscriptionExpired => {
                self.change_status(snapshot, event, now, SubscriptionStatus::Expired)
            }
            PaymentEventKind::Unknown(raw) => {
                tracing::debug!(
                    user_id = %snapshot.user_id,
                    event_id = %event.event_id,
                    provider_type = %raw,
                    "Ignoring unknown payment event kind"
                );
                Transition::unchanged(snapshot, Outcome::Ignored)
            }
        }
    }

    fn renew(
        &self,
        snapshot: &SubscriptionSnapshot,
        event: &PaymentEvent,
        now: Timestamp,
    ) -> Transition {
        if snapshot
            .processed_transaction_ids
            .contains(&event.transaction_id)
        {
            return Transition::unchanged(snapshot, Outcome::Duplicate);
        }

        let anchor = snapshot.expires_at.map_or(now, |current| current.later_of(now));
        let expires_at = anchor.add_months(self.policy.period_months);

        let mut next = touched(snapshot, event);
        next.status = SubscriptionStatus::Active;
        next.is_active = true;
        next.expires_at = Some(expires_at);
        next.processed_transaction_ids
            .record(event.transaction_id.clone(), self.policy.dedup_capacity);
        if let Some(agreement_id) = &event.billing_agreement_id {
            next.billing_agreement_id = Some(agreement_id.clone());
        }

        let effect = SubscriptionEvent::Renewed {
            user_id: snapshot.user_id.clone(),
            source_event_id: event.event_id.clone(),
            transaction_id: event.transaction_id.clone(),
            previous_expires_at: snapshot.expires_at,
            expires_at,
            repair: event.is_repair(),
            occurred_at: now,
        };
        Transition::applied(next, effect)
    }

    fn reactivate(
        &self,
        snapshot: &SubscriptionSnapshot,
        event: &PaymentEvent,
        now: Timestamp,
    ) -> Transition {
        if snapshot.status != SubscriptionStatus::Suspended {
            return Transition::unchanged(snapshot, Outcome::NoOp);
        }

        let mut next = touched(snapshot, event);
        next.status = SubscriptionStatus::Active;
        next.is_active = true;

        let effect = SubscriptionEvent::Reactivated {
            user_id: snapshot.user_id.clone(),
            source_event_id: event.event_id.clone(),
            occurred_at: now,
        };
        Transition::applied(next, effect)
    }

    fn change_status(
        &self,
        snapshot: &SubscriptionSnapshot,
        event: &PaymentEvent,
        now: Timestamp,
        target: SubscriptionStatus,
    ) -> Transition {
        if snapshot.status == target || !snapshot.status.can_transition_to(&target) {
            return Transition::unchanged(snapshot, Outcome::NoOp);
        }

        let mut next = touched(snapshot, event);
        next.status = target;

        let user_id = snapshot.user_id.clone();
        let source_event_id = event.event_id.clone();
        let effect = match target {
            SubscriptionStatus::Cancelled => SubscriptionEvent::Cancelled {
                user_id,
                source_event_id,
                access_until: next.expires_at,
                occurred_at: now,
            },
            SubscriptionStatus::Suspended => {
                next.is_active = false;
                SubscriptionEvent::Suspended {
                    user_id,
                    source_event_id,
                    occurred_at: now,
                }
            }
            _ => {
                next.is_active = false;
                SubscriptionEvent::Expired {
                    user_id,
                    source_event_id,
                    occurred_at: now,
                }
            }
        };
        Transition::applied(next, effect)
    }
}

/// Copy of `snapshot` with `last_event_at` advanced to cover `event`.
fn touched(snapshot: &SubscriptionSnapshot, event: &PaymentEvent) -> SubscriptionSnapshot {
    let mut next = snapshot.clone();
    next.last_event_at = Some(
        snapshot
            .last_event_at
            .map_or(event.occurred_at, |last| last.later_of(event.occurred_at)),
    );
    next
}

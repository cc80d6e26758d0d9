//! HandlePaymentWebhookHandler - the single decision entry point per webhook.
//!
//! normalize → resolve → lock(user) { read → apply → write } → publish
//!
//! Identity is resolved before the lock is taken and effects are published
//! after it is released, so the critical section brackets exactly one
//! snapshot read and one snapshot write. Repair replays enter at `replay`,
//! skipping only normalization.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{EventEnvelope, EventId, UserId};
use crate::domain::identity::{self, ResolutionStrategy};
use crate::domain::payment::{self, NormalizationError, PaymentEvent};
use crate::domain::subscription::{
    BillingPolicy, Entitlement, Outcome, SubscriptionEvent, SubscriptionSnapshot,
    SubscriptionStateMachine,
};
use crate::ports::{
    Clock, EventPublisher, IdentityIndex, IdentityLookup, SnapshotStore, SubscriptionLocks,
};

use super::WebhookError;

/// Default wait for a user's lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Parsed webhook body.
    pub payload: Value,
}

impl HandlePaymentWebhookCommand {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// Parses a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, WebhookError> {
        let payload = serde_json::from_slice(body)
            .map_err(|e| NormalizationError::invalid("$", e.to_string()))?;
        Ok(Self { payload })
    }
}

/// Result of webhook processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlePaymentWebhookResult {
    pub event_id: EventId,
    pub user_id: UserId,
    pub strategy: ResolutionStrategy,
    pub outcome: Outcome,
    /// The user's entitlement after this event.
    pub entitlement: Entitlement,
}

/// Handler for processing payment provider webhooks.
pub struct HandlePaymentWebhookHandler {
    lookup: Arc<dyn IdentityLookup>,
    index: Arc<dyn IdentityIndex>,
    store: Arc<dyn SnapshotStore>,
    locks: Arc<dyn SubscriptionLocks>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    machine: SubscriptionStateMachine,
    lock_timeout: Duration,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        lookup: Arc<dyn IdentityLookup>,
        index: Arc<dyn IdentityIndex>,
        store: Arc<dyn SnapshotStore>,
        locks: Arc<dyn SubscriptionLocks>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lookup,
            index,
            store,
            locks,
            publisher,
            clock,
            machine: SubscriptionStateMachine::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: BillingPolicy) -> Self {
        self.machine = SubscriptionStateMachine::new(policy);
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Handles one inbound webhook.
    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let event = payment::normalize(&cmd.payload).map_err(|e| {
            tracing::warn!(
                field = e.field().unwrap_or("-"),
                error = %e,
                "Rejecting malformed payment webhook"
            );
            WebhookError::from(e)
        })?;

        self.replay(event).await
    }

    /// Applies an already-normalized event. Used by repairs.
    pub async fn replay(
        &self,
        event: PaymentEvent,
    ) -> Result<HandlePaymentWebhookResult, WebhookError> {
        let resolution = identity::resolve(&event, self.lookup.as_ref())
            .await
            .map_err(|e| {
                tracing::warn!(event_id = %event.event_id, kind = %event.kind, error = %e, "Could not resolve payment event");
                WebhookError::from(e)
            })?;
        let user_id = resolution.user_id;

        let (transition, now) = {
            let _guard = self.locks.acquire(&user_id, self.lock_timeout).await?;

            let snapshot = self
                .store
                .read_snapshot(&user_id)
                .await
                .map_err(WebhookError::Store)?;
            let now = self.clock.now();
            let transition = self.machine.apply(&snapshot, &event, now);

            if transition.outcome.changed() {
                self.store
                    .write_snapshot(&user_id, &transition.snapshot)
                    .await
                    .map_err(|e| {
                        tracing::error!(user_id = %user_id, event_id = %event.event_id, error = %e, "Snapshot write failed");
                        WebhookError::Store(e)
                    })?;
            }
            if resolution.strategy != ResolutionStrategy::CurrentAgreement {
                self.sync_agreement(&user_id, &transition.snapshot).await;
            }
            (transition, now)
        };

        self.publish_effects(&event, &transition.effects).await;

        tracing::info!(
            event_id = %event.event_id,
            user_id = %user_id,
            kind = %event.kind,
            strategy = %resolution.strategy,
            outcome = %transition.outcome,
            repair = event.is_repair(),
            "Payment event processed"
        );

        Ok(HandlePaymentWebhookResult {
            event_id: event.event_id,
            user_id,
            strategy: resolution.strategy,
            outcome: transition.outcome,
            entitlement: transition.snapshot.entitlement(now),
        })
    }

    /// Points the current-agreement index at the agreement the snapshot now
    /// carries, so later events under it resolve without a custom field.
    /// The snapshot has committed; a failure is logged and the next event
    /// resolved by another strategy tries again.
    async fn sync_agreement(&self, user_id: &UserId, snapshot: &SubscriptionSnapshot) {
        let Some(agreement_id) = &snapshot.billing_agreement_id else {
            return;
        };
        if let Err(e) = self.index.record_current_agreement(user_id, agreement_id).await {
            tracing::error!(
                user_id = %user_id,
                billing_agreement_id = %agreement_id,
                error = %e,
                "Failed to record current billing agreement"
            );
        }
    }

    /// Publishes effects. The write has committed; failures are logged only.
    async fn publish_effects(&self, event: &PaymentEvent, effects: &[SubscriptionEvent]) {
        if effects.is_empty() {
            return;
        }

        let mut envelopes = Vec::with_capacity(effects.len());
        for effect in effects {
            match EventEnvelope::from_event(effect) {
                Ok(envelope) => {
                    envelopes.push(envelope.with_correlation_id(event.event_id.as_str()))
                }
                Err(e) => tracing::error!(event_id = %event.event_id, error = %e, "Failed to wrap subscription event"),
            }
        }

        if let Err(e) = self.publisher.publish_all(envelopes).await {
            tracing::error!(
                event_id = %event.event_id,
                error = %e,
                "Failed to publish subscription events"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        FixedClock, InMemoryEventBus, InMemoryIdentityDirectory, InMemorySnapshotStore,
        InMemoryUserLocks,
    };
    use crate::application::handlers::webhook::WebhookDisposition;
    use crate::domain::foundation::{BillingAgreementId, Timestamp};
    use crate::domain::subscription::SubscriptionStatus;
    use crate::ports::LockGuard;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct Fixture {
        directory: Arc<InMemoryIdentityDirectory>,
        store: Arc<InMemorySnapshotStore>,
        locks: Arc<InMemoryUserLocks>,
        bus: Arc<InMemoryEventBus>,
        clock: Arc<FixedClock>,
        handler: HandlePaymentWebhookHandler,
    }

    fn t0() -> Timestamp {
        Timestamp::from_datetime(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap())
    }

    async fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        directory.register_user(UserId::new("user-1").unwrap()).await;
        let store = Arc::new(InMemorySnapshotStore::new());
        let locks = Arc::new(InMemoryUserLocks::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let clock = Arc::new(FixedClock::new(t0()));
        let handler = HandlePaymentWebhookHandler::new(
            directory.clone(),
            directory.clone(),
            store.clone(),
            locks.clone(),
            bus.clone(),
            clock.clone(),
        )
        .with_lock_timeout(Duration::from_millis(50));

        Fixture {
            directory,
            store,
            locks,
            bus,
            clock,
            handler,
        }
    }

    fn sale(webhook_id: &str, tx: &str) -> HandlePaymentWebhookCommand {
        HandlePaymentWebhookCommand::new(json!({
            "id": webhook_id,
            "event_type": "PAYMENT.SALE.COMPLETED",
            "create_time": "2024-03-10T08:00:00Z",
            "resource": {
                "id": tx,
                "billing_agreement_id": "I-AGR-1",
                "custom": "user-1",
                "amount": { "total": "5.75", "currency": "CHF" },
                "create_time": "2024-03-10T08:00:00Z"
            }
        }))
    }

    #[tokio::test]
    async fn first_payment_is_applied_written_and_published() {
        let f = fixture().await;

        let result = f.handler.handle(sale("WH-1", "T1")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Applied);
        assert_eq!(result.strategy, ResolutionStrategy::CustomUserId);
        assert!(result.entitlement.entitled);
        assert_eq!(result.entitlement.access_until, Some(t0().add_months(1)));

        let stored = f.store.read_snapshot(&result.user_id).await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(f.store.write_count(), 1);

        let published = f.bus.published_events();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].event_type, "subscription.renewed.v1");
        assert_eq!(published[0].metadata.correlation_id.as_deref(), Some("WH-1"));
    }

    #[tokio::test]
    async fn redelivery_with_new_wrapper_id_is_duplicate_and_not_written() {
        let f = fixture().await;
        f.handler.handle(sale("WH-1", "T1")).await.unwrap();

        let result = f.handler.handle(sale("WH-1-REDELIVERED", "T1")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Duplicate);
        assert_eq!(f.store.write_count(), 1);
        assert_eq!(f.bus.event_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_before_touching_state() {
        let f = fixture().await;
        let cmd = HandlePaymentWebhookCommand::new(json!({
            "id": "WH-1",
            "event_type": "PAYMENT.SALE.COMPLETED",
            "resource": { "id": "T1", "custom": "user-1", "create_time": "2024-03-10T08:00:00Z" }
        }));

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert_eq!(err.disposition(), WebhookDisposition::Reject);
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn invalid_json_body_is_rejected() {
        let err = HandlePaymentWebhookCommand::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.disposition(), WebhookDisposition::Reject);
    }

    #[tokio::test]
    async fn unresolvable_event_goes_to_operator_queue() {
        let f = fixture().await;
        let cmd = HandlePaymentWebhookCommand::new(json!({
            "id": "WH-9",
            "event_type": "BILLING.SUBSCRIPTION.CANCELLED",
            "resource": { "id": "I-UNKNOWN", "create_time": "2024-03-10T08:00:00Z" }
        }));

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert_eq!(err.disposition(), WebhookDisposition::OperatorQueue);
        assert!(f.store.is_empty().await);
    }

    #[tokio::test]
    async fn held_lock_surfaces_as_concurrency_conflict() {
        let f = fixture().await;
        let _held: LockGuard = f
            .locks
            .acquire(&UserId::new("user-1").unwrap(), Duration::from_millis(50))
            .await
            .unwrap();

        let err = f.handler.handle(sale("WH-1", "T1")).await.unwrap_err();

        assert!(matches!(err, WebhookError::ConcurrencyConflict { .. }));
        assert!(err.is_retryable());
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn publish_failure_does_not_undo_the_write() {
        let f = fixture().await;
        f.bus.set_failing(true);

        let result = f.handler.handle(sale("WH-1", "T1")).await.unwrap();

        assert_eq!(result.outcome, Outcome::Applied);
        assert_eq!(f.store.write_count(), 1);
        assert_eq!(f.bus.event_count(), 0);
    }

    #[tokio::test]
    async fn unknown_kind_is_ignored_without_write() {
        let f = fixture().await;
        let cmd = HandlePaymentWebhookCommand::new(json!({
            "id": "WH-5",
            "event_type": "PAYMENT.SALE.REFUNDED",
            "resource": { "id": "R1", "custom": "user-1", "create_time": "2024-03-10T08:00:00Z" }
        }));

        let result = f.handler.handle(cmd).await.unwrap();

        assert_eq!(result.outcome, Outcome::Ignored);
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn agreement_learned_via_custom_field_resolves_next_payment() {
        let f = fixture().await;
        f.handler.handle(sale("WH-1", "T1")).await.unwrap();

        let mut next = sale("WH-2", "T2");
        next.payload["resource"]
            .as_object_mut()
            .unwrap()
            .remove("custom");
        let result = f.handler.handle(next).await.unwrap();

        assert_eq!(result.strategy, ResolutionStrategy::CurrentAgreement);
        assert_eq!(result.outcome, Outcome::Applied);
    }

    #[tokio::test]
    async fn renewal_links_user_by_current_agreement_afterwards() {
        let f = fixture().await;
        f.directory
            .link_agreement(
                UserId::new("user-1").unwrap(),
                BillingAgreementId::new("I-AGR-1").unwrap(),
            )
            .await;
        f.handler.handle(sale("WH-1", "T1")).await.unwrap();
        f.clock.advance_days(30);

        let result = f.handler.handle(sale("WH-2", "T2")).await.unwrap();

        assert_eq!(result.strategy, ResolutionStrategy::CurrentAgreement);
        assert_eq!(result.entitlement.access_until, Some(t0().add_months(2)));
    }
}

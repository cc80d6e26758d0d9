//! ApplyRepairsHandler - Executes repair plans for a reconciliation report.
//!
//! Replays go through `HandlePaymentWebhookHandler::replay`, so every repair
//! takes the user's lock and is deduplicated like live traffic. Running the
//! same report twice yields duplicates, not double renewals.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use crate::application::handlers::webhook::HandlePaymentWebhookHandler;
use crate::domain::foundation::UserId;
use crate::domain::reconciliation::{plan_repair, Discrepancy, ReconciliationReport, RepairPlan};
use crate::domain::subscription::Outcome;
use crate::ports::Clock;

/// Default number of replays in flight.
pub const DEFAULT_REPLAY_CONCURRENCY: usize = 8;

/// Command to repair the discrepancies of a report.
#[derive(Debug, Clone)]
pub struct ApplyRepairsCommand {
    pub report: ReconciliationReport,
    /// Plan only; nothing is replayed.
    pub dry_run: bool,
}

/// A plan for one discrepant user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRepair {
    pub user_id: UserId,
    pub discrepancy: Discrepancy,
    pub plan: RepairPlan,
}

/// A replay that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairFailure {
    pub user_id: UserId,
    pub error: String,
}

/// Result of applying repairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyRepairsResult {
    pub planned: Vec<PlannedRepair>,
    pub replayed: usize,
    pub duplicates: usize,
    /// Replays the state machine did not act on (`Ignored` or `NoOp`).
    pub unchanged: usize,
    pub manual_review: usize,
    pub failures: Vec<RepairFailure>,
}

/// Handler for applying repairs.
pub struct ApplyRepairsHandler {
    webhook: Arc<HandlePaymentWebhookHandler>,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl ApplyRepairsHandler {
    pub fn new(webhook: Arc<HandlePaymentWebhookHandler>, clock: Arc<dyn Clock>) -> Self {
        Self {
            webhook,
            clock,
            concurrency: DEFAULT_REPLAY_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn handle(&self, cmd: ApplyRepairsCommand) -> ApplyRepairsResult {
        let now = self.clock.now();
        let mut result = ApplyRepairsResult::default();
        let mut replays = Vec::new();

        for record in cmd.report.discrepancies() {
            let plan = plan_repair(record, now);
            match &plan {
                RepairPlan::NoAction => continue,
                RepairPlan::ManualReview { reason } => {
                    tracing::warn!(
                        user_id = %record.user_id,
                        discrepancy = %record.discrepancy,
                        reason = %reason,
                        "Discrepancy needs manual review"
                    );
                    result.manual_review += 1;
                }
                RepairPlan::Replay { event } => {
                    replays.push((record.user_id.clone(), event.clone()));
                }
            }
            result.planned.push(PlannedRepair {
                user_id: record.user_id.clone(),
                discrepancy: record.discrepancy,
                plan,
            });
        }

        if cmd.dry_run {
            tracing::info!(
                planned = result.planned.len(),
                replays = replays.len(),
                "Dry run; no repairs replayed"
            );
            return result;
        }

        let outcomes: Vec<_> = stream::iter(replays)
            .map(|(user_id, event)| {
                let webhook = Arc::clone(&self.webhook);
                async move { (user_id, webhook.replay(event).await) }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (user_id, outcome) in outcomes {
            match outcome {
                Ok(processed) => match processed.outcome {
                    Outcome::Applied => result.replayed += 1,
                    Outcome::Duplicate => result.duplicates += 1,
                    Outcome::Ignored | Outcome::NoOp => result.unchanged += 1,
                },
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Repair replay failed");
                    result.failures.push(RepairFailure {
                        user_id,
                        error: e.to_string(),
                    });
                }
            }
        }
        // Completion order is arbitrary.
        result.failures.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        tracing::info!(
            replayed = result.replayed,
            duplicates = result.duplicates,
            manual_review = result.manual_review,
            failures = result.failures.len(),
            "Repairs applied"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{
        FixedClock, InMemoryEventBus, InMemoryIdentityDirectory, InMemorySnapshotStore,
        InMemoryUserLocks,
    };
    use crate::domain::foundation::{BillingAgreementId, Timestamp};
    use crate::domain::reconciliation::{AgreementHistory, Ledger, ReconciliationPolicy, reconcile};
    use crate::domain::subscription::{SubscriptionSnapshot, SubscriptionStatus};
    use crate::ports::SnapshotStore;

    fn snap(user: &str, agreement: &str, expires_at: Timestamp) -> SubscriptionSnapshot {
        let mut s = SubscriptionSnapshot::new(UserId::new(user).unwrap());
        s.billing_agreement_id = Some(BillingAgreementId::new(agreement).unwrap());
        s.status = SubscriptionStatus::Active;
        s.is_active = true;
        s.expires_at = Some(expires_at);
        s
    }

    struct Fixture {
        store: Arc<InMemorySnapshotStore>,
        handler: ApplyRepairsHandler,
        report: ReconciliationReport,
        now: Timestamp,
    }

    async fn fixture() -> Fixture {
        let now = Timestamp::now();
        let expected = Ledger::from_snapshots(vec![
            snap("alice", "AGR-A", now.add_days(20)),
            snap("bob", "AGR-B", now.add_days(20)),
        ])
        .unwrap();
        let actual = Ledger::from_snapshots(vec![
            snap("alice", "AGR-A", now.minus_days(10)),
            snap("bob", "AGR-X", now.add_days(20)),
        ])
        .unwrap();
        let history = AgreementHistory::new();
        let report = ReconciliationReport::from_records(
            reconcile(&expected, &actual, &history, ReconciliationPolicy::default()),
            now,
        );

        let directory = Arc::new(InMemoryIdentityDirectory::new());
        directory.register_user(UserId::new("alice").unwrap()).await;
        directory.register_user(UserId::new("bob").unwrap()).await;
        let store = Arc::new(InMemorySnapshotStore::from_ledger(&actual));
        let clock = Arc::new(FixedClock::new(now));
        let webhook = Arc::new(HandlePaymentWebhookHandler::new(
            directory.clone(),
            directory,
            store.clone(),
            Arc::new(InMemoryUserLocks::new()),
            Arc::new(InMemoryEventBus::new()),
            clock.clone(),
        ));

        Fixture {
            store,
            handler: ApplyRepairsHandler::new(webhook, clock),
            report,
            now,
        }
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let f = fixture().await;

        let result = f
            .handler
            .handle(ApplyRepairsCommand {
                report: f.report.clone(),
                dry_run: true,
            })
            .await;

        assert_eq!(result.planned.len(), 2);
        assert_eq!(result.manual_review, 1);
        assert_eq!(result.replayed, 0);
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_renewal_is_replayed_and_mismatch_left_for_review() {
        let f = fixture().await;

        let result = f
            .handler
            .handle(ApplyRepairsCommand {
                report: f.report.clone(),
                dry_run: false,
            })
            .await;

        assert_eq!(result.replayed, 1);
        assert_eq!(result.manual_review, 1);
        assert!(result.failures.is_empty());

        let alice = f.store.read_snapshot(&UserId::new("alice").unwrap()).await.unwrap();
        assert_eq!(alice.expires_at, Some(f.now.add_months(1)));
        assert!(alice.entitlement(f.now).entitled);
    }

    #[tokio::test]
    async fn applying_the_same_report_twice_is_a_duplicate() {
        let f = fixture().await;
        let cmd = ApplyRepairsCommand {
            report: f.report.clone(),
            dry_run: false,
        };

        f.handler.handle(cmd.clone()).await;
        let second = f.handler.handle(cmd).await;

        assert_eq!(second.replayed, 0);
        assert_eq!(second.duplicates, 1);
        assert_eq!(f.store.write_count(), 1);
    }

    #[tokio::test]
    async fn unknown_user_is_reported_as_failure() {
        let f = fixture().await;
        let mut report = f.report.clone();
        for record in &mut report.records {
            record.user_id = UserId::new("ghost").unwrap();
        }

        let result = f
            .handler
            .handle(ApplyRepairsCommand {
                report,
                dry_run: false,
            })
            .await;

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].user_id.as_str(), "ghost");
    }
}

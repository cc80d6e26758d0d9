//! RunReconciliationHandler - Compares expected and actual ledgers.
//!
//! Read-only: the handler never writes snapshots. Fixes go through
//! `ApplyRepairsHandler`.

use std::sync::Arc;

use crate::domain::reconciliation::{
    reconcile, AgreementHistory, Ledger, ReconciliationPolicy, ReconciliationReport,
};
use crate::ports::Clock;

/// Command to run one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct RunReconciliationCommand {
    /// Ledger derived from the provider's transaction history.
    pub expected: Ledger,
    /// Ledger of the engine's stored snapshots.
    pub actual: Ledger,
    /// Empty when no agreement index is available.
    pub history: AgreementHistory,
}

/// Handler for reconciliation runs.
pub struct RunReconciliationHandler {
    clock: Arc<dyn Clock>,
    policy: ReconciliationPolicy,
}

impl RunReconciliationHandler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            policy: ReconciliationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconciliationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn handle(&self, cmd: RunReconciliationCommand) -> ReconciliationReport {
        let report = ReconciliationReport::from_records(
            reconcile(&cmd.expected, &cmd.actual, &cmd.history, self.policy),
            self.clock.now(),
        );

        for record in report.discrepancies() {
            tracing::debug!(
                user_id = %record.user_id,
                discrepancy = %record.discrepancy,
                "Reconciliation discrepancy"
            );
        }

        let summary = &report.summary;
        tracing::info!(
            total = summary.total,
            consistent = summary.consistent,
            missing_renewal = summary.missing_renewal,
            double_counted = summary.double_counted,
            identity_mismatch = summary.identity_mismatch,
            stale_agreement_id = summary.stale_agreement_id,
            "Reconciliation completed"
        );

        report
    }
}

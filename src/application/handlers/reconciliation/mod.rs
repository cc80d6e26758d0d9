//! Reconciliation handlers.

mod apply_repairs;
mod run_reconciliation;

pub use apply_repairs::{
    ApplyRepairsCommand, ApplyRepairsHandler, ApplyRepairsResult, PlannedRepair, RepairFailure,
    DEFAULT_REPLAY_CONCURRENCY,
};
pub use run_reconciliation::{RunReconciliationCommand, RunReconciliationHandler};

//! Reconciliation domain module.
//!
//! Offline comparison of an expected and an actual entitlement ledger, and
//! planning of repairs that go back through the state machine.

mod ledger;
mod record;
mod repair;
mod reporter;

pub use ledger::{AgreementHistory, Ledger};
pub use record::{Discrepancy, ReconciliationPolicy, ReconciliationRecord};
pub use repair::{plan_repair, RepairPlan};
pub use reporter::{reconcile, Reconciliation, ReconciliationReport, ReconciliationSummary};

//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod reconciliation;
pub mod webhook;

pub use reconciliation::{
    ApplyRepairsCommand, ApplyRepairsHandler, ApplyRepairsResult, PlannedRepair, RepairFailure,
    RunReconciliationCommand, RunReconciliationHandler,
};
pub use webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    WebhookDisposition, WebhookError,
};

//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own no state of their own; everything durable sits behind a port.

pub mod handlers;

pub use handlers::{
    // Reconciliation handlers
    ApplyRepairsCommand, ApplyRepairsHandler, ApplyRepairsResult,
    RunReconciliationCommand, RunReconciliationHandler,
    // Webhook handlers
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    WebhookDisposition, WebhookError,
};

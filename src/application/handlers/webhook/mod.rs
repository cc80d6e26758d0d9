//! Webhook handlers.

mod errors;
mod handle_payment_webhook;

pub use errors::{WebhookDisposition, WebhookError};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
    DEFAULT_LOCK_TIMEOUT,
};

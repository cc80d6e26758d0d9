//! Payment event domain module.
//!
//! - `event` - Canonical `PaymentEvent` and its kinds
//! - `normalizer` - Raw provider payload to `PaymentEvent`
//! - `errors` - `NormalizationError`

mod errors;
mod event;
mod normalizer;

pub use errors::NormalizationError;
pub use event::{EventOrigin, PaymentEvent, PaymentEventKind};
pub use normalizer::normalize;

#[cfg(test)]
pub use event::PaymentEventBuilder;

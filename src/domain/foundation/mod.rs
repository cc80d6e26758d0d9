//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers and error types that form the
//! vocabulary of the entitlement engine.

mod errors;
mod events;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{DomainEvent, EventEnvelope, EventId, EventMetadata};
pub use ids::{BillingAgreementId, TransactionId, UserId};
pub use money::{Currency, Money};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;

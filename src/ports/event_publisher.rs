//! EventPublisher port - Interface for publishing domain events.
//!
//! Subscription side effects leave the engine through this port after the
//! snapshot write commits. The transport (queue, outbox, in-process bus)
//! is the adapter's concern.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventEnvelope};

/// Port for publishing domain events.
///
/// Implementations must ensure:
/// - Events are delivered at-least-once (consumers dedupe on `event_id`)
/// - Errors are propagated to the caller
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    async fn publish(&self, event: EventEnvelope) -> Result<(), DomainError>;

    /// Publish several events in order.
    ///
    /// Adapters without batch support publish sequentially and stop at the
    /// first failure.
    async fn publish_all(&self, events: Vec<EventEnvelope>) -> Result<(), DomainError>;
}

//! Subscription domain module.
//!
//! Per-user entitlement snapshots and the state machine that is the single
//! gateway for changing them. Live webhooks and repair replays both go
//! through `SubscriptionStateMachine::apply`.

mod events;
mod machine;
mod outcome;
mod snapshot;
mod status;

pub use events::SubscriptionEvent;
pub use machine::{BillingPolicy, SubscriptionStateMachine, Transition, DEFAULT_DEDUP_CAPACITY};
pub use outcome::Outcome;
pub use snapshot::{Entitlement, ProcessedTransactions, SubscriptionSnapshot};
pub use status::SubscriptionStatus;

//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports; the
//! surrounding service owns their lifecycle.
//!
//! - `IdentityLookup` - read-only identity queries for the resolver
//! - `IdentityIndex` - records the agreement a written snapshot carries
//! - `SnapshotStore` - the read/write boundary of the per-user critical section
//! - `SubscriptionLocks` - per-user mutual exclusion
//! - `EventPublisher` - outbound subscription events
//! - `Clock` - processing time

mod clock;
mod event_publisher;
mod identity_index;
mod identity_lookup;
mod snapshot_store;
mod subscription_locks;

pub use clock::Clock;
pub use event_publisher::EventPublisher;
pub use identity_index::IdentityIndex;
pub use identity_lookup::IdentityLookup;
pub use snapshot_store::SnapshotStore;
pub use subscription_locks::{LockError, LockGuard, SubscriptionLocks};

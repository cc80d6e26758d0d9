//! SnapshotStore port - persistence of subscription snapshots.
//!
//! The webhook handler brackets exactly one `read_snapshot` and one
//! `write_snapshot` inside the per-user lock; implementations need no
//! locking of their own beyond what keeps a single call atomic.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::subscription::SubscriptionSnapshot;

/// Port for reading and writing one user's snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Current snapshot for `user_id`.
    ///
    /// Users that never had a subscription get a fresh `None`-status
    /// snapshot rather than an error.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn read_snapshot(&self, user_id: &UserId) -> Result<SubscriptionSnapshot, DomainError>;

    /// Replaces the stored snapshot for `user_id`.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `snapshot.user_id` is not `user_id`
    /// - `DatabaseError` on persistence failure
    async fn write_snapshot(
        &self,
        user_id: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), DomainError>;
}

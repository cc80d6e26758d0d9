//! SubscriptionLocks port - per-user mutual exclusion.
//!
//! Read-snapshot, apply, write-snapshot is a check-then-act sequence on the
//! dedup set and on `expires_at`. Two deliveries for the same user must not
//! interleave inside it.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// Failure to enter a user's critical section.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("Timed out waiting for subscription lock of user {user_id}")]
    Timeout { user_id: String },

    #[error("Subscription lock unavailable: {0}")]
    Unavailable(String),
}

/// Held for the duration of the critical section; dropping it releases.
pub struct LockGuard {
    _held: Box<dyn Send>,
}

impl LockGuard {
    pub fn new(held: impl Send + 'static) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LockGuard")
    }
}

/// Port for per-user locks.
#[async_trait]
pub trait SubscriptionLocks: Send + Sync {
    /// Waits up to `timeout` for exclusive access to `user_id`.
    ///
    /// # Errors
    ///
    /// - `Timeout` if another holder kept the lock past `timeout`
    /// - `Unavailable` if the lock backend cannot be reached
    async fn acquire(&self, user_id: &UserId, timeout: Duration) -> Result<LockGuard, LockError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn dropping_guard_releases_held_value() {
        let released = Arc::new(AtomicBool::new(false));
        let guard = LockGuard::new(SetOnDrop(released.clone()));

        assert!(!released.load(Ordering::SeqCst));
        drop(guard);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn timeout_message_names_user() {
        let err = LockError::Timeout {
            user_id: "user-1".to_string(),
        };
        assert!(err.to_string().contains("user-1"));
    }
}

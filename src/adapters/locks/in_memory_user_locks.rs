//! In-process per-user locks.
//!
//! One `tokio::sync::Mutex` per user id. Entries nobody holds or waits on
//! are pruned on the next acquire, so the table tracks only busy users.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::domain::foundation::UserId;
use crate::ports::{LockError, LockGuard, SubscriptionLocks};

/// Per-user locks for a single process.
#[derive(Debug, Default)]
pub struct InMemoryUserLocks {
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl InMemoryUserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a live lock entry.
    pub fn tracked_users(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(user_id.clone()).or_default().clone()
    }
}

#[async_trait]
impl SubscriptionLocks for InMemoryUserLocks {
    async fn acquire(&self, user_id: &UserId, timeout: Duration) -> Result<LockGuard, LockError> {
        let lock = self.lock_for(user_id);
        match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(LockGuard::new(guard)),
            Err(_) => Err(LockError::Timeout {
                user_id: user_id.to_string(),
            }),
        }
    }
}

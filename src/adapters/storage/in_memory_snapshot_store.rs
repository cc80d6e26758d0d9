//! In-memory snapshot store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::reconciliation::Ledger;
use crate::domain::subscription::SubscriptionSnapshot;
use crate::ports::SnapshotStore;

/// In-memory `SnapshotStore` for tests and single-node embeddings.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<UserId, SubscriptionSnapshot>>>,
    writes: Arc<AtomicUsize>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated from a ledger.
    pub fn from_ledger(ledger: &Ledger) -> Self {
        let snapshots = ledger
            .iter()
            .map(|(user_id, snapshot)| (user_id.clone(), snapshot.clone()))
            .collect();
        Self {
            snapshots: Arc::new(RwLock::new(snapshots)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Everything stored, as a ledger.
    pub async fn to_ledger(&self) -> Ledger {
        let snapshots = self.snapshots.read().await;
        let mut ledger = Ledger::new();
        for snapshot in snapshots.values() {
            ledger.insert(snapshot.clone());
        }
        ledger
    }

    /// Number of successful `write_snapshot` calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn read_snapshot(&self, user_id: &UserId) -> Result<SubscriptionSnapshot, DomainError> {
        Ok(self
            .snapshots
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| SubscriptionSnapshot::new(user_id.clone())))
    }

    async fn write_snapshot(
        &self,
        user_id: &UserId,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<(), DomainError> {
        if &snapshot.user_id != user_id {
            return Err(DomainError::validation(
                "user_id",
                format!(
                    "Snapshot for {} cannot be written under {}",
                    snapshot.user_id, user_id
                ),
            ));
        }

        self.snapshots
            .write()
            .await
            .insert(user_id.clone(), snapshot.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

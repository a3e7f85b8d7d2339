//! Per-owner mutual exclusion within one process.
//!
//! Ingestions for the same owner take turns; different owners never wait on
//! each other. The database store adds its own advisory lock on top, which
//! covers multiple processes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::OwnerId;

/// Registry of one async mutex per owner.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    slots: Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access for `owner`. Access is released when the
    /// guard drops.
    pub async fn acquire(&self, owner: OwnerId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            // Drop slots nobody holds or waits on.
            slots.retain(|id, m| *id == owner || Arc::strong_count(m) > 1);
            Arc::clone(slots.entry(owner).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of owners with a live slot.
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_owner_is_serialized() {
        let locks = Arc::new(OwnerLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.acquire(1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire once released")
            .unwrap();
    }

    #[tokio::test]
    async fn different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _a = locks.acquire(1).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_slots_are_pruned() {
        let locks = OwnerLocks::new();
        for owner in 0..10 {
            let _g = locks.acquire(owner).await;
        }
        let _g = locks.acquire(100).await;
        assert_eq!(locks.tracked(), 1);
    }
}

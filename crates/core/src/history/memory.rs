//! In-memory history store.
//!
//! [`InMemoryHistoryStore`] keeps every snapshot behind a single `RwLock`.
//! Each operation runs entirely under the lock, which makes writes atomic
//! and reads consistent.
//!
//! ## Limitations
//!
//! - No durability: all state is lost when the process exits.
//! - Single-process only.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use super::{
    CommittedUpload, EquipmentRow, HistoryStore, NewEquipmentRow, NewUploadSnapshot,
    SnapshotDetail, UploadSnapshot, WriteBudget,
};
use crate::error::CoreError;
use crate::retention::{eviction_candidates, newest_first};
use crate::types::{DbId, OwnerId, Timestamp};

#[derive(Debug)]
struct StoredSnapshot {
    snapshot: UploadSnapshot,
    rows: Vec<EquipmentRow>,
}

#[derive(Debug, Default)]
struct Shelf {
    next_snapshot_id: DbId,
    next_row_id: DbId,
    last_created: Option<Timestamp>,
    snapshots: BTreeMap<DbId, StoredSnapshot>,
}

impl Shelf {
    fn insert(&mut self, new: &NewUploadSnapshot, rows: &[NewEquipmentRow]) -> UploadSnapshot {
        self.next_snapshot_id += 1;
        let id = self.next_snapshot_id;

        // Creation times never go backwards, so id order and time order agree.
        let now = Utc::now();
        let created_at = match self.last_created {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_created = Some(created_at);

        let snapshot = UploadSnapshot {
            id,
            owner_id: new.owner_id,
            file_name: new.file_name.clone(),
            created_at,
            total_records: rows.len() as i64,
            avg_flowrate: new.summary.mean_flowrate,
            avg_pressure: new.summary.mean_pressure,
            avg_temperature: new.summary.mean_temperature,
        };

        let mut stored_rows = Vec::with_capacity(rows.len());
        for row in rows {
            self.next_row_id += 1;
            stored_rows.push(row.clone().into_row(self.next_row_id, id));
        }
        stored_rows.sort_by_key(|r| (r.position, r.id));

        self.snapshots.insert(
            id,
            StoredSnapshot {
                snapshot: snapshot.clone(),
                rows: stored_rows,
            },
        );
        snapshot
    }

    fn owned_by(&self, owner: OwnerId) -> impl Iterator<Item = &UploadSnapshot> {
        self.snapshots
            .values()
            .map(|s| &s.snapshot)
            .filter(move |s| s.owner_id == owner)
    }

    fn evict(&mut self, owner: OwnerId, keep: usize) -> Vec<DbId> {
        let doomed = eviction_candidates(self.owned_by(owner), keep);
        for id in &doomed {
            self.snapshots.remove(id);
        }
        doomed
    }
}

/// Thread-safe in-memory [`HistoryStore`].
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    shelf: RwLock<Shelf>,
}

/// Converts a lock poison error to a storage error.
fn poison_err<T>(_: PoisonError<T>) -> CoreError {
    CoreError::Storage("history lock poisoned".into())
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of snapshots held, across all owners.
    pub fn snapshot_count(&self) -> Result<usize, CoreError> {
        Ok(self.shelf.read().map_err(poison_err)?.snapshots.len())
    }

    /// Total number of rows held, across all snapshots.
    pub fn row_count(&self) -> Result<usize, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        Ok(shelf.snapshots.values().map(|s| s.rows.len()).sum())
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn create(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
    ) -> Result<UploadSnapshot, CoreError> {
        let mut shelf = self.shelf.write().map_err(poison_err)?;
        Ok(shelf.insert(snapshot, rows))
    }

    async fn create_retaining(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
        keep: usize,
        budget: &WriteBudget,
    ) -> Result<CommittedUpload, CoreError> {
        let mut shelf = self.shelf.write().map_err(poison_err)?;
        budget.check()?;
        let snapshot = shelf.insert(snapshot, rows);
        let evicted = shelf.evict(snapshot.owner_id, keep);
        Ok(CommittedUpload { snapshot, evicted })
    }

    async fn find(&self, id: DbId) -> Result<Option<UploadSnapshot>, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        Ok(shelf.snapshots.get(&id).map(|s| s.snapshot.clone()))
    }

    async fn latest(&self, owner: OwnerId) -> Result<Option<UploadSnapshot>, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        Ok(shelf
            .owned_by(owner)
            .min_by(|a, b| newest_first(a, b))
            .cloned())
    }

    async fn recent(
        &self,
        owner: OwnerId,
        limit: usize,
    ) -> Result<Vec<UploadSnapshot>, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        let mut owned: Vec<UploadSnapshot> = shelf.owned_by(owner).cloned().collect();
        owned.sort_by(newest_first);
        owned.truncate(limit);
        Ok(owned)
    }

    async fn rows(&self, snapshot_id: DbId) -> Result<Vec<EquipmentRow>, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        Ok(shelf
            .snapshots
            .get(&snapshot_id)
            .map(|s| s.rows.clone())
            .unwrap_or_default())
    }

    async fn find_with_rows(&self, id: DbId) -> Result<Option<SnapshotDetail>, CoreError> {
        let shelf = self.shelf.read().map_err(poison_err)?;
        Ok(shelf.snapshots.get(&id).map(|s| SnapshotDetail {
            snapshot: s.snapshot.clone(),
            rows: s.rows.clone(),
        }))
    }

    async fn delete_older_than_rank(&self, owner: OwnerId, keep: usize) -> Result<u64, CoreError> {
        let mut shelf = self.shelf.write().map_err(poison_err)?;
        Ok(shelf.evict(owner, keep).len() as u64)
    }

    async fn delete(&self, owner: OwnerId, id: DbId) -> Result<bool, CoreError> {
        let mut shelf = self.shelf.write().map_err(poison_err)?;
        let owned = shelf
            .snapshots
            .get(&id)
            .is_some_and(|s| s.snapshot.owner_id == owner);
        if owned {
            shelf.snapshots.remove(&id);
        }
        Ok(owned)
    }

    async fn ping(&self) -> Result<(), CoreError> {
        let _shelf = self.shelf.read().map_err(poison_err)?;
        Ok(())
    }
}

//! Persistent upload history, owned per user.
//!
//! [`HistoryStore`] is the only surface the pipeline uses to read or write
//! snapshots. The PostgreSQL implementation lives in `chemviz-db`;
//! [`memory::InMemoryHistoryStore`] serves tests and database-less runs.
//!
//! ## Consistency
//!
//! - `create` and `create_retaining` are all-or-nothing.
//! - `create_retaining` honours its [`WriteBudget`] up to the commit point
//!   only. A write that has started to commit is finished, never abandoned.
//! - `create_retaining` must not interleave with another `create_retaining`
//!   for the same owner between its insert and its eviction.
//! - `find_with_rows` returns a snapshot and rows read at the same point in
//!   time, or `None` if the snapshot was evicted.

pub mod memory;
pub mod model;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::types::{DbId, OwnerId};

pub use model::{EquipmentRow, NewEquipmentRow, NewUploadSnapshot, SnapshotDetail, UploadSnapshot};

const LATEST_READ_ATTEMPTS: usize = 3;

/// Result of an insert-then-evict commit.
#[derive(Debug, Clone, PartialEq)]
pub struct CommittedUpload {
    pub snapshot: UploadSnapshot,
    /// Ids of the owner's snapshots removed by the retention rule.
    pub evicted: Vec<DbId>,
}

/// Deadline and cancellation a write observes until it commits.
#[derive(Debug, Clone)]
pub struct WriteBudget {
    timeout: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl WriteBudget {
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            deadline: Instant::now().checked_add(timeout),
            cancel,
        }
    }

    /// Budget that never runs out.
    pub fn unbounded() -> Self {
        Self {
            timeout: Duration::MAX,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    fn cancelled(&self) -> CoreError {
        CoreError::Cancelled("write cancelled before commit".into())
    }

    fn expired(&self) -> CoreError {
        CoreError::Storage(format!("write did not reach commit within {:?}", self.timeout))
    }

    /// Fail if the budget is already spent.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(self.expired());
        }
        Ok(())
    }

    /// Drive `fut` until it finishes or the budget runs out, whichever is
    /// first. `fut` is dropped when the budget wins, so it must not commit.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, CoreError>
    where
        F: Future<Output = Result<T, CoreError>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(self.cancelled()),
            () = deadline => Err(self.expired()),
            res = fut => res,
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert a snapshot and all of its rows atomically.
    async fn create(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
    ) -> Result<UploadSnapshot, CoreError>;

    /// Insert a snapshot with its rows, then delete all but the owner's
    /// newest `keep` snapshots, in one transaction. Work before the commit
    /// is abandoned with no effect once `budget` runs out; the commit
    /// itself is not.
    async fn create_retaining(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
        keep: usize,
        budget: &WriteBudget,
    ) -> Result<CommittedUpload, CoreError>;

    async fn find(&self, id: DbId) -> Result<Option<UploadSnapshot>, CoreError>;

    /// Newest snapshot for an owner.
    async fn latest(&self, owner: OwnerId) -> Result<Option<UploadSnapshot>, CoreError>;

    /// Newest-first snapshots for an owner, at most `limit`.
    async fn recent(&self, owner: OwnerId, limit: usize)
        -> Result<Vec<UploadSnapshot>, CoreError>;

    /// Rows of a snapshot in insertion order. Empty if the snapshot is gone.
    async fn rows(&self, snapshot_id: DbId) -> Result<Vec<EquipmentRow>, CoreError>;

    /// Snapshot plus rows from one consistent read.
    async fn find_with_rows(&self, id: DbId) -> Result<Option<SnapshotDetail>, CoreError>;

    /// Delete all but the newest `keep` snapshots of an owner. Returns the
    /// number of snapshots removed.
    async fn delete_older_than_rank(&self, owner: OwnerId, keep: usize) -> Result<u64, CoreError>;

    /// Delete one snapshot of an owner (rows cascade). Returns `false` if the
    /// owner has no snapshot with that id.
    async fn delete(&self, owner: OwnerId, id: DbId) -> Result<bool, CoreError>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<(), CoreError>;

    /// Newest snapshot of an owner together with its rows. Re-reads if the
    /// snapshot is evicted between the lookup and the load.
    async fn latest_detail(&self, owner: OwnerId) -> Result<Option<SnapshotDetail>, CoreError> {
        for _ in 0..LATEST_READ_ATTEMPTS {
            let Some(latest) = self.latest(owner).await? else {
                return Ok(None);
            };
            if let Some(detail) = self.find_with_rows(latest.id).await? {
                return Ok(Some(detail));
            }
            tracing::debug!(owner_id = owner, snapshot_id = latest.id, "Latest snapshot evicted during read");
        }
        Ok(None)
    }
}

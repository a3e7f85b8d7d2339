//! PostgreSQL implementation of the history store contract.
//!
//! Writes run in one transaction each. `create_retaining` first takes a
//! transaction-scoped advisory lock keyed by owner, so concurrent uploads
//! for one owner (from any process) apply insert and eviction one after
//! another. Its staging work runs under the caller's write budget; if the
//! budget runs out first the open transaction is dropped, which rolls back.
//! The COMMIT is sent outside the budget and always awaited.

use std::time::Duration;

use async_trait::async_trait;
use chemviz_core::error::CoreError;
use chemviz_core::history::{
    CommittedUpload, EquipmentRow, HistoryStore, NewEquipmentRow, NewUploadSnapshot,
    SnapshotDetail, UploadSnapshot, WriteBudget,
};
use chemviz_core::types::{DbId, OwnerId};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::repositories::{EquipmentRowRepo, UploadSnapshotRepo};

/// Log a database error with full detail and convert it for callers.
fn storage_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> CoreError {
    move |e| {
        tracing::error!(operation, error = %e, "History store query failed");
        CoreError::Storage(format!("{operation}: {e}"))
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Fail a write with a storage error if the owner lock or a row lock
    /// cannot be taken within `timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    async fn apply_lock_timeout(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        if let Some(timeout) = self.lock_timeout {
            // SET does not take bind parameters; the value is an integer.
            let sql = format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1));
            sqlx::query(&sql).execute(conn).await?;
        }
        Ok(())
    }

    async fn insert_snapshot(
        conn: &mut PgConnection,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
    ) -> Result<UploadSnapshot, sqlx::Error> {
        let record = UploadSnapshotRepo::create(&mut *conn, snapshot, to_i64(rows.len())).await?;
        EquipmentRowRepo::batch_insert(conn, record.id, rows).await?;
        Ok(record.into())
    }

    async fn commit_new(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
    ) -> Result<UploadSnapshot, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        self.apply_lock_timeout(&mut *tx).await?;
        let created = Self::insert_snapshot(&mut *tx, snapshot, rows).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Everything up to the commit point. The returned transaction is
    /// still open; dropping it rolls back.
    async fn stage_retaining(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
        keep: usize,
    ) -> Result<(Transaction<'static, Postgres>, CommittedUpload), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        self.apply_lock_timeout(&mut *tx).await?;
        UploadSnapshotRepo::lock_owner(&mut *tx, snapshot.owner_id).await?;

        let created = Self::insert_snapshot(&mut *tx, snapshot, rows).await?;
        let evicted =
            UploadSnapshotRepo::delete_older_than_rank(&mut *tx, snapshot.owner_id, to_i64(keep))
                .await?;

        Ok((
            tx,
            CommittedUpload {
                snapshot: created,
                evicted,
            },
        ))
    }

    async fn read_detail(&self, id: DbId) -> Result<Option<SnapshotDetail>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        // Both reads see the same database snapshot.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(snapshot) = UploadSnapshotRepo::find_by_id(&mut *tx, id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        let rows = EquipmentRowRepo::list_for_snapshot(&mut *tx, id).await?;
        tx.commit().await?;

        Ok(Some(SnapshotDetail {
            snapshot: snapshot.into(),
            rows: rows.into_iter().map(Into::into).collect(),
        }))
    }

    async fn evict(&self, owner: OwnerId, keep: usize) -> Result<Vec<DbId>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        UploadSnapshotRepo::lock_owner(&mut *tx, owner).await?;
        let removed =
            UploadSnapshotRepo::delete_older_than_rank(&mut *tx, owner, to_i64(keep)).await?;
        tx.commit().await?;
        Ok(removed)
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn create(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
    ) -> Result<UploadSnapshot, CoreError> {
        self.commit_new(snapshot, rows)
            .await
            .map_err(storage_err("create snapshot"))
    }

    async fn create_retaining(
        &self,
        snapshot: &NewUploadSnapshot,
        rows: &[NewEquipmentRow],
        keep: usize,
        budget: &WriteBudget,
    ) -> Result<CommittedUpload, CoreError> {
        let (tx, committed) = budget
            .run(async {
                self.stage_retaining(snapshot, rows, keep)
                    .await
                    .map_err(storage_err("create snapshot with retention"))
            })
            .await?;
        tx.commit()
            .await
            .map_err(storage_err("commit snapshot with retention"))?;
        if !committed.evicted.is_empty() {
            tracing::debug!(
                owner_id = snapshot.owner_id,
                evicted = ?committed.evicted,
                "Evicted snapshots beyond retention cap",
            );
        }
        Ok(committed)
    }

    async fn find(&self, id: DbId) -> Result<Option<UploadSnapshot>, CoreError> {
        let record = UploadSnapshotRepo::find_by_id(&self.pool, id)
            .await
            .map_err(storage_err("find snapshot"))?;
        Ok(record.map(Into::into))
    }

    async fn latest(&self, owner: OwnerId) -> Result<Option<UploadSnapshot>, CoreError> {
        let record = UploadSnapshotRepo::latest_for_owner(&self.pool, owner)
            .await
            .map_err(storage_err("latest snapshot"))?;
        Ok(record.map(Into::into))
    }

    async fn recent(&self, owner: OwnerId, limit: usize) -> Result<Vec<UploadSnapshot>, CoreError> {
        let records = UploadSnapshotRepo::list_recent(&self.pool, owner, to_i64(limit))
            .await
            .map_err(storage_err("recent snapshots"))?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn rows(&self, snapshot_id: DbId) -> Result<Vec<EquipmentRow>, CoreError> {
        let records = EquipmentRowRepo::list_for_snapshot(&self.pool, snapshot_id)
            .await
            .map_err(storage_err("snapshot rows"))?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    async fn find_with_rows(&self, id: DbId) -> Result<Option<SnapshotDetail>, CoreError> {
        self.read_detail(id)
            .await
            .map_err(storage_err("snapshot detail"))
    }

    async fn delete_older_than_rank(&self, owner: OwnerId, keep: usize) -> Result<u64, CoreError> {
        let removed = self
            .evict(owner, keep)
            .await
            .map_err(storage_err("apply retention"))?;
        Ok(removed.len() as u64)
    }

    async fn delete(&self, owner: OwnerId, id: DbId) -> Result<bool, CoreError> {
        UploadSnapshotRepo::delete(&self.pool, owner, id)
            .await
            .map_err(storage_err("delete snapshot"))
    }

    async fn ping(&self) -> Result<(), CoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(storage_err("ping"))
    }
}

//! Repository for the `upload_snapshots` table.

use chemviz_core::history::NewUploadSnapshot;
use chemviz_core::types::{DbId, OwnerId};
use sqlx::PgExecutor;

use crate::models::upload_snapshot::SnapshotRecord;

/// Column list for `upload_snapshots` queries.
const COLUMNS: &str = "\
    id, owner_id, file_name, created_at, total_records, \
    avg_flowrate, avg_pressure, avg_temperature";

/// Newest-first ordering shared by every ranked query.
const NEWEST_FIRST: &str = "ORDER BY created_at DESC, id DESC";

pub struct UploadSnapshotRepo;

impl UploadSnapshotRepo {
    /// Insert a snapshot. `created_at` is read from the clock at execution
    /// time, not at transaction start.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewUploadSnapshot,
        total_records: i64,
    ) -> Result<SnapshotRecord, sqlx::Error> {
        let sql = format!(
            "INSERT INTO upload_snapshots \
                (owner_id, file_name, created_at, total_records, \
                 avg_flowrate, avg_pressure, avg_temperature) \
             VALUES ($1, $2, clock_timestamp(), $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SnapshotRecord>(&sql)
            .bind(input.owner_id)
            .bind(&input.file_name)
            .bind(total_records)
            .bind(input.summary.mean_flowrate)
            .bind(input.summary.mean_pressure)
            .bind(input.summary.mean_temperature)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<SnapshotRecord>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM upload_snapshots WHERE id = $1");
        sqlx::query_as::<_, SnapshotRecord>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Newest snapshot of an owner.
    pub async fn latest_for_owner<'e, E: PgExecutor<'e>>(
        executor: E,
        owner: OwnerId,
    ) -> Result<Option<SnapshotRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM upload_snapshots WHERE owner_id = $1 {NEWEST_FIRST} LIMIT 1"
        );
        sqlx::query_as::<_, SnapshotRecord>(&sql)
            .bind(owner)
            .fetch_optional(executor)
            .await
    }

    /// Up to `limit` snapshots of an owner, newest first.
    pub async fn list_recent<'e, E: PgExecutor<'e>>(
        executor: E,
        owner: OwnerId,
        limit: i64,
    ) -> Result<Vec<SnapshotRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM upload_snapshots WHERE owner_id = $1 {NEWEST_FIRST} LIMIT $2"
        );
        sqlx::query_as::<_, SnapshotRecord>(&sql)
            .bind(owner)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Delete all but the newest `keep` snapshots of an owner. Rows cascade.
    /// Returns the ids removed.
    pub async fn delete_older_than_rank<'e, E: PgExecutor<'e>>(
        executor: E,
        owner: OwnerId,
        keep: i64,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let sql = format!(
            "DELETE FROM upload_snapshots \
             WHERE owner_id = $1 \
               AND id NOT IN ( \
                   SELECT id FROM upload_snapshots WHERE owner_id = $1 {NEWEST_FIRST} LIMIT $2 \
               ) \
             RETURNING id"
        );
        sqlx::query_scalar::<_, DbId>(&sql)
            .bind(owner)
            .bind(keep)
            .fetch_all(executor)
            .await
    }

    /// Delete one snapshot of an owner. Returns `true` if a row was removed.
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        owner: OwnerId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM upload_snapshots WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Take the transaction-scoped advisory lock for an owner. Released at
    /// commit or rollback.
    pub async fn lock_owner<'e, E: PgExecutor<'e>>(
        executor: E,
        owner: OwnerId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(owner)
            .execute(executor)
            .await?;
        Ok(())
    }
}

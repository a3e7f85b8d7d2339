//! Upload ingestion: parse, aggregate, persist, evict.
//!
//! Parsing and aggregation are pure CPU work and run on the blocking pool.
//! The persist step holds the owner's lock and runs under a
//! [`WriteBudget`] built from the configured timeout and the caller's
//! cancellation token. The budget covers lock acquisition and the store's
//! work up to its commit point; running out there leaves nothing visible.
//! Once the store starts committing, the write is seen through.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::history::{
    CommittedUpload, HistoryStore, NewEquipmentRow, NewUploadSnapshot, UploadSnapshot,
    WriteBudget,
};
use crate::locks::OwnerLocks;
use crate::retention::RETENTION_CAP;
use crate::stats::StatsAggregator;
use crate::table::{FieldIssue, TableParser};
use crate::types::{DbId, OwnerId};

/// Longest file name kept on a snapshot, in characters.
pub const MAX_FILE_NAME_LEN: usize = 255;

/// Name used when the client supplies none.
pub const DEFAULT_FILE_NAME: &str = "upload.csv";

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Snapshots retained per owner after each ingestion.
    pub retention_cap: usize,
    /// Budget for acquiring the owner lock and reaching the commit point.
    pub store_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            retention_cap: RETENTION_CAP,
            store_timeout: Duration::from_secs(10),
        }
    }
}

/// Parsed and aggregated upload, ready to persist.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub snapshot: NewUploadSnapshot,
    pub rows: Vec<NewEquipmentRow>,
    pub issues: Vec<FieldIssue>,
}

/// What an ingestion committed.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub snapshot: UploadSnapshot,
    pub evicted: Vec<DbId>,
    /// Numeric cells that were coerced to their default.
    pub issues: Vec<FieldIssue>,
}

/// Reduce a client-supplied name to its final path component, bounded in
/// length. Empty names fall back to [`DEFAULT_FILE_NAME`].
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILE_NAME_LEN)
        .collect();
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

/// Parse `bytes` and aggregate in one pass over the row stream.
pub fn prepare_upload(
    owner: OwnerId,
    file_name: &str,
    bytes: &[u8],
) -> Result<PreparedUpload, CoreError> {
    let stream = TableParser::parse(bytes)?;
    let mut aggregator = StatsAggregator::new(stream.metrics());

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    for record in stream.records() {
        let mut record = record?;
        aggregator.observe(&record);
        rows.push(NewEquipmentRow::from(&record));
        issues.append(&mut record.issues);
    }

    Ok(PreparedUpload {
        snapshot: NewUploadSnapshot {
            owner_id: owner,
            file_name: file_name.to_string(),
            summary: aggregator.finish(),
        },
        rows,
        issues,
    })
}

/// Runs uploads through the pipeline against one [`HistoryStore`].
pub struct IngestionCoordinator {
    store: Arc<dyn HistoryStore>,
    config: IngestConfig,
    locks: OwnerLocks,
}

impl IngestionCoordinator {
    pub fn new(store: Arc<dyn HistoryStore>, config: IngestConfig) -> Self {
        Self {
            store,
            config,
            locks: OwnerLocks::new(),
        }
    }

    pub async fn ingest(
        &self,
        owner: OwnerId,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadSnapshot, CoreError> {
        let outcome = self
            .ingest_with_cancel(owner, file_name, bytes, &CancellationToken::new())
            .await?;
        Ok(outcome.snapshot)
    }

    /// Like [`ingest`](Self::ingest), aborting with
    /// [`CoreError::Cancelled`] if `cancel` fires before the store starts
    /// to commit.
    pub async fn ingest_with_cancel(
        &self,
        owner: OwnerId,
        file_name: &str,
        bytes: Vec<u8>,
        cancel: &CancellationToken,
    ) -> Result<IngestOutcome, CoreError> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled("ingestion cancelled before start".into()));
        }

        let name = sanitize_file_name(file_name);
        let prepared =
            tokio::task::spawn_blocking(move || prepare_upload(owner, &name, &bytes))
                .await
                .map_err(|e| CoreError::Internal(format!("parse task failed: {e}")))?
                .inspect_err(|e| {
                    tracing::info!(owner_id = owner, error = %e, "Upload rejected");
                })?;

        if !prepared.issues.is_empty() {
            tracing::warn!(
                owner_id = owner,
                coerced = prepared.issues.len(),
                "Non-numeric measurement cells coerced to default",
            );
        }

        let budget = WriteBudget::new(self.config.store_timeout, cancel.clone());
        let committed = self
            .persist(&prepared, &budget)
            .await
            .inspect_err(|e| match e {
                CoreError::Cancelled(_) => {
                    tracing::warn!(owner_id = owner, "Ingestion cancelled before commit");
                }
                _ => tracing::error!(owner_id = owner, error = %e, "Persist step failed"),
            })?;

        tracing::info!(
            owner_id = owner,
            snapshot_id = committed.snapshot.id,
            records = committed.snapshot.total_records,
            evicted = committed.evicted.len(),
            "Upload ingested",
        );

        Ok(IngestOutcome {
            snapshot: committed.snapshot,
            evicted: committed.evicted,
            issues: prepared.issues,
        })
    }

    /// Insert and evict while holding the owner's lock.
    async fn persist(
        &self,
        prepared: &PreparedUpload,
        budget: &WriteBudget,
    ) -> Result<CommittedUpload, CoreError> {
        let owner = prepared.snapshot.owner_id;
        let _guard = budget.run(async { Ok(self.locks.acquire(owner).await) }).await?;
        self.store
            .create_retaining(&prepared.snapshot, &prepared.rows, self.config.retention_cap, budget)
            .await
    }
}

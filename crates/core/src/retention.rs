//! Bounded per-owner history.
//!
//! After every ingestion an owner keeps only their newest
//! [`RETENTION_CAP`] snapshots. "Newest" is creation time descending with
//! the snapshot id as tie-breaker.

use std::cmp::Ordering;

use crate::history::UploadSnapshot;
use crate::types::DbId;

/// Maximum number of snapshots retained per owner.
pub const RETENTION_CAP: usize = 5;

/// Newest-first ordering for snapshots.
pub fn newest_first(a: &UploadSnapshot, b: &UploadSnapshot) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Ids of the snapshots that fall beyond the newest `keep`.
///
/// `snapshots` must all belong to the same owner; order does not matter.
pub fn eviction_candidates<'a, I>(snapshots: I, keep: usize) -> Vec<DbId>
where
    I: IntoIterator<Item = &'a UploadSnapshot>,
{
    let mut ordered: Vec<&UploadSnapshot> = snapshots.into_iter().collect();
    ordered.sort_by(|a, b| newest_first(a, b));
    ordered.into_iter().skip(keep).map(|s| s.id).collect()
}

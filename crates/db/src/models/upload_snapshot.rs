use chemviz_core::history::UploadSnapshot;
use chemviz_core::types::{DbId, OwnerId, Timestamp};
use sqlx::FromRow;

/// A row from the `upload_snapshots` table.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRecord {
    pub id: DbId,
    pub owner_id: OwnerId,
    pub file_name: String,
    pub created_at: Timestamp,
    pub total_records: i64,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
}

impl From<SnapshotRecord> for UploadSnapshot {
    fn from(r: SnapshotRecord) -> Self {
        Self {
            id: r.id,
            owner_id: r.owner_id,
            file_name: r.file_name,
            created_at: r.created_at,
            total_records: r.total_records,
            avg_flowrate: r.avg_flowrate,
            avg_pressure: r.avg_pressure,
            avg_temperature: r.avg_temperature,
        }
    }
}

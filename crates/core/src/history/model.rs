//! Upload snapshot and equipment row entities.

use serde::Serialize;

use crate::stats::Summary;
use crate::table::{EquipmentRecord, Metric};
use crate::types::{DbId, OwnerId, Timestamp};

/// One ingested file's persisted summary. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSnapshot {
    pub id: DbId,
    #[serde(skip)]
    pub owner_id: OwnerId,
    pub file_name: String,
    #[serde(rename = "uploaded_at")]
    pub created_at: Timestamp,
    pub total_records: i64,
    pub avg_flowrate: Option<f64>,
    pub avg_pressure: Option<f64>,
    pub avg_temperature: Option<f64>,
}

/// One data row belonging to exactly one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquipmentRow {
    #[serde(skip)]
    pub id: DbId,
    #[serde(skip)]
    pub snapshot_id: DbId,
    /// Insertion order within the snapshot (the source row index).
    #[serde(skip)]
    pub position: i32,
    pub equipment_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// A snapshot read together with its rows at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotDetail {
    pub snapshot: UploadSnapshot,
    pub rows: Vec<EquipmentRow>,
}

/// Input for creating a snapshot. The store assigns id and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUploadSnapshot {
    pub owner_id: OwnerId,
    pub file_name: String,
    pub summary: Summary,
}

/// Input for one child row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEquipmentRow {
    pub position: i32,
    pub equipment_id: String,
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl From<&EquipmentRecord> for NewEquipmentRow {
    fn from(record: &EquipmentRecord) -> Self {
        Self {
            position: i32::try_from(record.index).unwrap_or(i32::MAX),
            equipment_id: record.equipment_id.clone(),
            name: record.name.clone(),
            equipment_type: record.equipment_type.clone(),
            flowrate: record.stored_value(Metric::Flowrate),
            pressure: record.stored_value(Metric::Pressure),
            temperature: record.stored_value(Metric::Temperature),
        }
    }
}

impl NewEquipmentRow {
    /// Materialize the stored row once ids are known.
    pub fn into_row(self, id: DbId, snapshot_id: DbId) -> EquipmentRow {
        EquipmentRow {
            id,
            snapshot_id,
            position: self.position,
            equipment_id: self.equipment_id,
            name: self.name,
            equipment_type: self.equipment_type,
            flowrate: self.flowrate,
            pressure: self.pressure,
            temperature: self.temperature,
        }
    }
}

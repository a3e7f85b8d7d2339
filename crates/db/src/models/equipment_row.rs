use chemviz_core::history::EquipmentRow;
use chemviz_core::types::DbId;
use sqlx::FromRow;

/// A row from the `equipment_rows` table.
#[derive(Debug, Clone, FromRow)]
pub struct EquipmentRowRecord {
    pub id: DbId,
    pub snapshot_id: DbId,
    pub position: i32,
    pub equipment_id: String,
    pub name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl From<EquipmentRowRecord> for EquipmentRow {
    fn from(r: EquipmentRowRecord) -> Self {
        Self {
            id: r.id,
            snapshot_id: r.snapshot_id,
            position: r.position,
            equipment_id: r.equipment_id,
            name: r.name,
            equipment_type: r.equipment_type,
            flowrate: r.flowrate,
            pressure: r.pressure,
            temperature: r.temperature,
        }
    }
}

//! Repository for the `equipment_rows` table.

use chemviz_core::history::NewEquipmentRow;
use chemviz_core::types::DbId;
use sqlx::{PgConnection, PgExecutor};

use crate::models::equipment_row::EquipmentRowRecord;

/// Column list for `equipment_rows` SELECT queries.
const COLUMNS: &str = "\
    id, snapshot_id, position, equipment_id, name, equipment_type, \
    flowrate, pressure, temperature";

/// Column list for INSERT (excludes the generated `id`).
const INSERT_COLUMNS: &str = "\
    snapshot_id, position, equipment_id, name, equipment_type, \
    flowrate, pressure, temperature";

const INSERT_PARAMS: usize = 8;

/// Rows per INSERT statement. Postgres allows at most 65535 bind
/// parameters per statement.
pub const BATCH_ROWS: usize = 1000;

pub struct EquipmentRowRepo;

impl EquipmentRowRepo {
    /// Insert all rows of a snapshot with multi-row INSERT statements of at
    /// most [`BATCH_ROWS`] rows each. Returns the number of rows inserted.
    ///
    /// Run inside the snapshot's transaction so a failed chunk rolls back
    /// the whole upload.
    pub async fn batch_insert(
        conn: &mut PgConnection,
        snapshot_id: DbId,
        rows: &[NewEquipmentRow],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;
        for chunk in rows.chunks(BATCH_ROWS) {
            let query = insert_statement(chunk.len());
            let mut q = sqlx::query(&query);
            for row in chunk {
                q = q
                    .bind(snapshot_id)
                    .bind(row.position)
                    .bind(&row.equipment_id)
                    .bind(&row.name)
                    .bind(&row.equipment_type)
                    .bind(row.flowrate)
                    .bind(row.pressure)
                    .bind(row.temperature);
            }
            inserted += q.execute(&mut *conn).await?.rows_affected();
        }
        Ok(inserted)
    }

    /// Rows of a snapshot in insertion order.
    pub async fn list_for_snapshot<'e, E: PgExecutor<'e>>(
        executor: E,
        snapshot_id: DbId,
    ) -> Result<Vec<EquipmentRowRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM equipment_rows WHERE snapshot_id = $1 ORDER BY position, id"
        );
        sqlx::query_as::<_, EquipmentRowRecord>(&sql)
            .bind(snapshot_id)
            .fetch_all(executor)
            .await
    }

    pub async fn count_for_snapshot<'e, E: PgExecutor<'e>>(
        executor: E,
        snapshot_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM equipment_rows WHERE snapshot_id = $1")
            .bind(snapshot_id)
            .fetch_one(executor)
            .await
    }
}

/// Build `INSERT ... VALUES ($1, ..), ($9, ..)` for `rows` rows.
fn insert_statement(rows: usize) -> String {
    let mut query = format!("INSERT INTO equipment_rows ({INSERT_COLUMNS}) VALUES ");
    let mut param_idx = 1usize;
    for r in 0..rows {
        if r > 0 {
            query.push_str(", ");
        }
        query.push('(');
        for i in 0..INSERT_PARAMS {
            if i > 0 {
                query.push_str(", ");
            }
            query.push_str(&format!("${param_idx}"));
            param_idx += 1;
        }
        query.push(')');
    }
    query
}

//! Row structs for the history tables.
//!
//! Each submodule holds a `FromRow` struct matching the table columns and a
//! conversion into the corresponding `chemviz-core` entity.

pub mod equipment_row;
pub mod upload_snapshot;

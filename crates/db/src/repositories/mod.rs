//! Repository layer.
//!
//! Each repository is a zero-sized struct whose methods take an executor
//! (pool or open transaction) as the first argument.

pub mod equipment_row_repo;
pub mod upload_snapshot_repo;

pub use equipment_row_repo::EquipmentRowRepo;
pub use upload_snapshot_repo::UploadSnapshotRepo;

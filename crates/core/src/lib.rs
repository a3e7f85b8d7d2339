//! Equipment telemetry pipeline: tolerant table parsing, summary statistics,
//! bounded per-owner upload history and snapshot reports.
//!
//! This crate has no SQL and no HTTP. Persistence goes through the
//! [`history::HistoryStore`] contract, implemented in-memory here and for
//! PostgreSQL in `chemviz-db`.

pub mod codepage;
pub mod error;
pub mod history;
pub mod ingestion;
pub mod locks;
pub mod report;
pub mod retention;
pub mod stats;
pub mod table;
pub mod types;

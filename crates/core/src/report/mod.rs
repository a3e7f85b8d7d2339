//! Printable reports for stored snapshots.
//!
//! [`ReportRenderer`] is read-only: it loads one snapshot together with its
//! rows in a single consistent read, builds a [`ReportLayout`] and writes it
//! as PDF.

pub mod layout;
pub mod pdf;

use std::sync::Arc;

use crate::error::CoreError;
use crate::history::{HistoryStore, SnapshotDetail};
use crate::types::{DbId, OwnerId};

pub use layout::ReportLayout;

/// Detail rows shown in a report; the rest are counted but not listed.
pub const REPORT_ROW_LIMIT: usize = 50;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub snapshot_id: DbId,
    /// Suggested download name, `report_{id}.pdf`.
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    fn from_detail(detail: &SnapshotDetail) -> Self {
        let layout = ReportLayout::build(detail);
        let id = detail.snapshot.id;
        Self {
            snapshot_id: id,
            file_name: format!("report_{id}.pdf"),
            content_type: PDF_CONTENT_TYPE,
            bytes: pdf::write_pdf(&layout, detail.snapshot.created_at),
        }
    }
}

pub struct ReportRenderer {
    store: Arc<dyn HistoryStore>,
}

impl ReportRenderer {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Render any snapshot by id.
    pub async fn render(&self, snapshot_id: DbId) -> Result<RenderedReport, CoreError> {
        let detail = self.load(snapshot_id).await?;
        Ok(RenderedReport::from_detail(&detail))
    }

    /// Render a snapshot only if `owner` owns it. Foreign snapshots are
    /// reported as not found.
    pub async fn render_for_owner(
        &self,
        owner: OwnerId,
        snapshot_id: DbId,
    ) -> Result<RenderedReport, CoreError> {
        let detail = self.load(snapshot_id).await?;
        if detail.snapshot.owner_id != owner {
            return Err(not_found(snapshot_id));
        }
        Ok(RenderedReport::from_detail(&detail))
    }

    /// Render the owner's newest snapshot, if any.
    pub async fn render_latest(&self, owner: OwnerId) -> Result<Option<RenderedReport>, CoreError> {
        let detail = self.store.latest_detail(owner).await?;
        Ok(detail.as_ref().map(RenderedReport::from_detail))
    }

    async fn load(&self, snapshot_id: DbId) -> Result<SnapshotDetail, CoreError> {
        self.store
            .find_with_rows(snapshot_id)
            .await?
            .ok_or_else(|| not_found(snapshot_id))
    }
}

fn not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "UploadSnapshot",
        id,
    }
}

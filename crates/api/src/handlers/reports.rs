//! PDF report downloads.

use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use chemviz_core::report::RenderedReport;
use chemviz_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

fn attachment(report: RenderedReport) -> Response {
    (
        [
            (CONTENT_TYPE, report.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.file_name),
            ),
        ],
        report.bytes,
    )
        .into_response()
}

/// GET /api/v1/uploads/{id}/report
pub async fn download_report(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let report = state.reports.render_for_owner(user.owner_id, id).await?;
    tracing::debug!(owner_id = user.owner_id, snapshot_id = id, size = report.bytes.len(), "Report rendered");
    Ok(attachment(report))
}

/// GET /api/v1/report/latest
pub async fn download_latest(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let report = state
        .reports
        .render_latest(user.owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No uploads to report on".into()))?;
    Ok(attachment(report))
}

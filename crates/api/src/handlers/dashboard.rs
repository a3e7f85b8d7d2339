//! Dashboard projection of the caller's latest upload.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chemviz_core::history::{EquipmentRow, SnapshotDetail, UploadSnapshot};
use chemviz_core::stats::{type_distribution, TypeCount};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub summary: UploadSnapshot,
    /// Row count per equipment type, most common first.
    pub distribution: Vec<TypeCount>,
    pub equipment_list: Vec<EquipmentRow>,
}

impl From<SnapshotDetail> for Dashboard {
    fn from(detail: SnapshotDetail) -> Self {
        Self {
            distribution: type_distribution(&detail.rows),
            summary: detail.snapshot,
            equipment_list: detail.rows,
        }
    }
}

/// GET /api/v1/dashboard
///
/// 204 when the caller has no uploads yet.
pub async fn get_dashboard(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let Some(detail) = state.history.latest_detail(user.owner_id).await? else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };
    let data = Dashboard::from(detail);
    Ok(Json(DataResponse { data }).into_response())
}

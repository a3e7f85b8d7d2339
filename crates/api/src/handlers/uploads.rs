//! Handlers for uploading files and reading or deleting stored snapshots.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chemviz_core::error::CoreError;
use chemviz_core::history::{EquipmentRow, UploadSnapshot};
use chemviz_core::ingestion::DEFAULT_FILE_NAME;
use chemviz_core::table::FieldIssue;
use chemviz_core::types::DbId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

/// Created snapshot plus the cells that were coerced to defaults.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub snapshot: UploadSnapshot,
    pub warnings: Vec<FieldIssue>,
}

fn snapshot_not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "UploadSnapshot",
        id,
    })
}

/// POST /api/v1/uploads
///
/// Multipart form with a required `file` field. Parses, aggregates and
/// stores the file as a new snapshot, evicting the caller's oldest
/// snapshots beyond the retention cap.
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UploadResponse>>)> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or(DEFAULT_FILE_NAME).to_string();
        let data = field.bytes().await?;
        file = Some((file_name, data.to_vec()));
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::BadRequest("No file provided".into()))?;

    tracing::debug!(
        owner_id = user.owner_id,
        file_name = %file_name,
        size = bytes.len(),
        "Upload received",
    );

    let cancel = state.shutdown.child_token();
    let outcome = state
        .ingestion
        .ingest_with_cancel(user.owner_id, &file_name, bytes, &cancel)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UploadResponse {
                snapshot: outcome.snapshot,
                warnings: outcome.issues,
            },
        }),
    ))
}

/// GET /api/v1/uploads/{id}
pub async fn get_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UploadSnapshot>>> {
    let snapshot = state
        .history
        .find(id)
        .await?
        .filter(|s| s.owner_id == user.owner_id)
        .ok_or_else(|| snapshot_not_found(id))?;
    Ok(Json(DataResponse { data: snapshot }))
}

/// GET /api/v1/uploads/{id}/rows
///
/// Rows in insertion order.
pub async fn list_rows(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EquipmentRow>>>> {
    let detail = state
        .history
        .find_with_rows(id)
        .await?
        .filter(|d| d.snapshot.owner_id == user.owner_id)
        .ok_or_else(|| snapshot_not_found(id))?;
    Ok(Json(DataResponse { data: detail.rows }))
}

/// DELETE /api/v1/uploads/{id}
pub async fn delete_upload(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !state.history.delete(user.owner_id, id).await? {
        return Err(snapshot_not_found(id));
    }
    tracing::info!(owner_id = user.owner_id, snapshot_id = id, "Snapshot deleted");
    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Query, State};
use axum::Json;
use chemviz_core::history::UploadSnapshot;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::query::{validated, HistoryParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/history?limit=
///
/// The caller's snapshots, newest first.
pub async fn list_history(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<DataResponse<Vec<UploadSnapshot>>>> {
    let params = validated(params)?;
    let snapshots = state.history.recent(user.owner_id, params.limit()).await?;
    Ok(Json(DataResponse { data: snapshots }))
}

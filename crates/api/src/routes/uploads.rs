//! Route definitions for uploads and per-snapshot resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{reports, uploads};
use crate::state::AppState;

/// Routes mounted at `/uploads`.
///
/// ```text
/// POST   /               -> upload
/// GET    /{id}           -> get_upload
/// DELETE /{id}           -> delete_upload
/// GET    /{id}/rows      -> list_rows
/// GET    /{id}/report    -> download_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(uploads::upload))
        .route("/{id}", get(uploads::get_upload).delete(uploads::delete_upload))
        .route("/{id}/rows", get(uploads::list_rows))
        .route("/{id}/report", get(reports::download_report))
}

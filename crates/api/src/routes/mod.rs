pub mod dashboard;
pub mod health;
pub mod history;
pub mod uploads;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Every route requires a bearer token; data is scoped to the token's owner.
///
/// ```text
/// /uploads                   upload a CSV file (POST, multipart `file`)
/// /uploads/{id}              get, delete one snapshot
/// /uploads/{id}/rows         equipment rows of a snapshot
/// /uploads/{id}/report       PDF report of a snapshot
///
/// /history?limit=            most recent snapshots, newest first
///
/// /dashboard                 latest snapshot with type distribution
/// /report/latest             PDF report of the latest snapshot
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/uploads", uploads::router())
        .nest("/history", history::router())
        .nest("/dashboard", dashboard::router())
        .route("/report/latest", get(handlers::reports::download_latest))
}

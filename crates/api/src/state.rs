use std::sync::Arc;

use chemviz_core::history::HistoryStore;
use chemviz_core::ingestion::IngestionCoordinator;
use chemviz_core::report::ReportRenderer;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub history: Arc<dyn HistoryStore>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub reports: Arc<ReportRenderer>,
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server begins shutting down; in-flight uploads
    /// abort before commit.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(history: Arc<dyn HistoryStore>, config: ServerConfig) -> Self {
        let ingestion = IngestionCoordinator::new(Arc::clone(&history), config.ingest_config());
        Self {
            ingestion: Arc::new(ingestion),
            reports: Arc::new(ReportRenderer::new(Arc::clone(&history))),
            history,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }
}

//! Catalog Sync Library
//!
//! Keeps a local music catalog mirror in step with an external catalog
//! manager. This library exposes modules for use in integration tests.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

use services::{JobContext, SyncEngine};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Get the start time of the application.
    pub fn start_time(&self) -> std::time::Instant {
        self.start_time
    }

    /// Create a job context for manual job execution.
    pub fn job_context(&self) -> JobContext {
        JobContext {
            engine: Arc::clone(&self.engine),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub message: String,
    pub version: String,
    pub uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Catalog sync is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time().elapsed().as_secs(),
    })
}

/// Build the HTTP router shared by the binary and the integration tests.
pub fn router(state: AppState) -> Router {
    let sync_routes = Router::new()
        .route("/", post(api::sync::trigger_sync))
        .route("/status", get(api::sync::sync_status));

    let album_routes = Router::new()
        .route(
            "/:id/download",
            get(api::catalog::download_status).post(api::catalog::request_download),
        )
        .route("/:id/import", post(api::catalog::import_folder));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/sync", sync_routes)
        .route("/api/artists", post(api::catalog::onboard_artist))
        .nest("/api/albums", album_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

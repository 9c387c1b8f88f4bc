//! Sync API endpoints: trigger a pass and inspect the last one.

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::db::store::CatalogCounts;
use crate::error::Result;
use crate::services::scheduler::run_full_sync_job;
use crate::services::SyncReport;
use crate::AppState;

/// Response for a manual sync trigger.
#[derive(Debug, Serialize)]
pub struct SyncTriggerResponse {
    pub accepted: bool,
    pub already_running: bool,
    pub message: String,
}

/// Current sync state and mirror size.
#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub running: bool,
    pub last_report: Option<SyncReport>,
    pub counts: CatalogCounts,
}

/// POST /api/sync
///
/// Spawns a full pass and returns immediately. When a pass is already
/// running the new one is skipped by the run-lock.
pub async fn trigger_sync(State(state): State<AppState>) -> Json<SyncTriggerResponse> {
    let already_running = state.engine.is_running();
    let ctx = state.job_context();

    tokio::spawn(async move {
        run_full_sync_job(&ctx).await;
    });

    tracing::info!(already_running, "Manually triggered sync");

    let message = if already_running {
        "A sync is already running; this request will be skipped".to_string()
    } else {
        "Sync has been triggered".to_string()
    };

    Json(SyncTriggerResponse {
        accepted: true,
        already_running,
        message,
    })
}

/// GET /api/sync/status
pub async fn sync_status(State(state): State<AppState>) -> Result<Json<SyncStatusResponse>> {
    let counts = state.engine.store().counts().await?;

    Ok(Json(SyncStatusResponse {
        running: state.engine.is_running(),
        last_report: state.engine.last_report().await,
        counts,
    }))
}

//! Catalog source operations: onboarding artists and driving album downloads.
//!
//! Album IDs in these routes are catalog source IDs, not local ones.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::catalog_source::{ArtistRecord, ImportMode, ImportOutcome, QueueStatus};
use crate::AppState;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OnboardArtistRequest {
    pub name: String,
    pub foreign_id: String,
}

impl OnboardArtistRequest {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Artist name cannot be empty".to_string()));
        }
        if self.foreign_id.trim().is_empty() {
            return Err(AppError::BadRequest("Foreign ID cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct DownloadRequestResponse {
    pub album_id: i64,
    pub accepted: bool,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub folder: String,
    #[serde(default)]
    pub import_mode: ImportMode,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/artists
pub async fn onboard_artist(
    State(state): State<AppState>,
    Json(req): Json<OnboardArtistRequest>,
) -> Result<Json<ArtistRecord>> {
    req.validate()?;
    let artist = state.engine.onboard_artist(&req.name, &req.foreign_id).await?;
    Ok(Json(artist))
}

/// POST /api/albums/:id/download
pub async fn request_download(
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
) -> Json<DownloadRequestResponse> {
    let accepted = state.engine.request_album_download(album_id).await;
    Json(DownloadRequestResponse { album_id, accepted })
}

/// GET /api/albums/:id/download
pub async fn download_status(
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
) -> Json<QueueStatus> {
    Json(state.engine.album_download_status(album_id).await)
}

/// POST /api/albums/:id/import
pub async fn import_folder(
    State(state): State<AppState>,
    Path(album_id): Path<i64>,
    Json(req): Json<ImportRequest>,
) -> Result<Json<ImportOutcome>> {
    if req.folder.trim().is_empty() {
        return Err(AppError::BadRequest("Folder cannot be empty".to_string()));
    }
    let outcome = state
        .engine
        .import_album_folder(album_id, req.folder.trim(), req.import_mode)
        .await;
    Ok(Json(outcome))
}

//! Reconciliation engine.
//!
//! A pass runs three stages in order: artists, then albums, then tracks.
//! Each stage reads what the previous one stored, so the order matters.
//! Only one pass runs at a time; a pass requested while another is running
//! is skipped.

pub mod albums;
pub mod artists;
pub mod tracks;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

use crate::config::CatalogSourceConfig;
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::services::catalog_source::{
    AddArtistRequest, AddOptions, ArtistRecord, CatalogSource, ImportMode, ImportOutcome,
    QueueStatus,
};
use crate::services::genre::GenreResolver;
use crate::services::locator::FileLocator;

pub use albums::AlbumReconciler;
pub use artists::ArtistReconciler;
pub use tracks::TrackReconciler;

// =============================================================================
// Reports
// =============================================================================

/// Per-stage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageStats {
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub artists: StageStats,
    pub albums: StageStats,
    pub tracks: StageStats,
    /// Set when a stage aborted the pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct SyncEngine {
    store: CatalogStore,
    source: Arc<dyn CatalogSource>,
    config: CatalogSourceConfig,
    artists: ArtistReconciler,
    albums: AlbumReconciler,
    tracks: TrackReconciler,
    run_lock: Mutex<()>,
    last_report: RwLock<Option<SyncReport>>,
}

impl SyncEngine {
    pub fn new(
        store: CatalogStore,
        source: Arc<dyn CatalogSource>,
        locator: FileLocator,
        config: CatalogSourceConfig,
    ) -> Self {
        let genres = GenreResolver::new(store.clone());
        Self {
            artists: ArtistReconciler::new(store.clone(), source.clone(), genres.clone()),
            albums: AlbumReconciler::new(store.clone(), source.clone(), genres),
            tracks: TrackReconciler::new(store.clone(), source.clone(), locator),
            store,
            source,
            config,
            run_lock: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    /// Create a new engine wrapped in Arc for shared access.
    pub fn new_shared(
        store: CatalogStore,
        source: Arc<dyn CatalogSource>,
        locator: FileLocator,
        config: CatalogSourceConfig,
    ) -> Arc<Self> {
        Arc::new(Self::new(store, source, locator, config))
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Whether a pass currently holds the run-lock.
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Report of the most recent completed pass.
    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    /// Run a complete artist, album and track pass.
    ///
    /// Returns `None` when another pass is already running.
    pub async fn run_full_sync(&self) -> Option<SyncReport> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::info!("Sync already in progress, skipping");
            return None;
        };

        tracing::info!("Starting catalog sync");
        let started_at = Utc::now();
        let timer = Instant::now();

        let artists = self.artists.reconcile_all().await;
        let (albums, tracks, error) = match self.albums.reconcile_all().await {
            Ok(albums) => match self.tracks.reconcile_all().await {
                Ok(tracks) => (albums, tracks, None),
                Err(e) => (albums, StageStats::default(), Some(e)),
            },
            Err(e) => (StageStats::default(), StageStats::default(), Some(e)),
        };

        if let Some(e) = &error {
            tracing::error!(error = %e, "Catalog sync aborted");
        }
        let error = error.map(|e| e.to_string());

        let report = SyncReport {
            started_at,
            finished_at: Utc::now(),
            duration_ms: timer.elapsed().as_millis() as u64,
            artists,
            albums,
            tracks,
            error,
        };

        tracing::info!(
            duration_ms = report.duration_ms,
            artists_created = report.artists.created,
            albums_created = report.albums.created,
            albums_downloaded = report.albums.updated,
            tracks_created = report.tracks.created,
            failures = report.artists.failed + report.albums.failed + report.tracks.failed,
            "Catalog sync finished"
        );

        *self.last_report.write().await = Some(report.clone());
        Some(report)
    }

    /// The source offers no change feed, so this is a full pass.
    pub async fn run_incremental_sync(&self) -> Option<SyncReport> {
        tracing::debug!("Running incremental sync as a full pass");
        self.run_full_sync().await
    }

    // =========================================================================
    // Source Operations
    // =========================================================================

    /// Make sure an artist exists both in the catalog source and locally.
    ///
    /// Returns the source's record of the artist.
    pub async fn onboard_artist(&self, name: &str, foreign_id: &str) -> Result<ArtistRecord> {
        let name = name.trim();
        let foreign_id = foreign_id.trim();
        if name.is_empty() || foreign_id.is_empty() {
            return Err(AppError::BadRequest(
                "Artist name and foreign ID are required".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_artist_by_foreign_id(foreign_id).await? {
            let lidarr_id = existing.lidarr_id.ok_or_else(|| {
                AppError::Internal(format!("Artist {} has no catalog source ID", existing.id))
            })?;
            tracing::debug!(artist_id = existing.id, lidarr_id, "Artist already onboarded");
            return self.source.get_artist(lidarr_id).await?.ok_or_else(|| {
                AppError::NotFound(format!("Artist {} not found in catalog source", lidarr_id))
            });
        }

        // The source may already track the artist even if we never stored it
        let known = self.source.find_artists_by_foreign_id(foreign_id).await?;
        let mut record = match known.into_iter().find(|a| a.id.is_some()) {
            Some(record) => record,
            None => {
                let request = AddArtistRequest {
                    artist_name: name.to_string(),
                    foreign_artist_id: foreign_id.to_string(),
                    quality_profile_id: self.config.quality_profile_id,
                    metadata_profile_id: self.config.metadata_profile_id,
                    root_folder_path: self.config.root_folder_path.clone(),
                    add_options: AddOptions::default(),
                };
                self.source.add_artist(&request).await?
            }
        };

        if record.foreign_artist_id.is_none() {
            record.foreign_artist_id = Some(foreign_id.to_string());
        }

        let (artist, _) = self.artists.create_from_record(&record, Some(name)).await?;
        tracing::info!(artist_id = artist.id, foreign_id = %foreign_id, "Onboarded artist");
        Ok(record)
    }

    /// Mark an album monitored and ask the source to search for it.
    ///
    /// A failed search still counts as accepted; the source retries on its own
    /// schedule once the album is monitored.
    pub async fn request_album_download(&self, album_id: i64) -> bool {
        match self.source.set_album_monitored(album_id, true).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(album_id, "Catalog source did not accept monitoring change");
                return false;
            }
            Err(e) => {
                tracing::error!(album_id, error = %e, "Failed to monitor album");
                return false;
            }
        }

        if let Err(e) = self.source.trigger_album_search(album_id).await {
            tracing::warn!(album_id, error = %e, "Album search failed to start");
        }
        true
    }

    pub async fn album_download_status(&self, album_id: i64) -> QueueStatus {
        match self.source.album_queue_status(album_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(album_id, error = %e, "Failed to fetch queue status");
                QueueStatus::error(e.to_string())
            }
        }
    }

    /// Import a downloaded folder into an album.
    pub async fn import_album_folder(
        &self,
        album_id: i64,
        folder: &str,
        mode: ImportMode,
    ) -> ImportOutcome {
        let candidates = match self.source.manual_import_candidates(folder, false, false).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(album_id, folder = %folder, error = %e, "Failed to list import candidates");
                Vec::new()
            }
        };

        let Some(first_path) = candidates.iter().find_map(|c| c.path.as_deref()) else {
            return ImportOutcome {
                success: false,
                message: "No files to import".to_string(),
            };
        };
        let import_folder = parent_folder(first_path);

        match self.source.import_album(album_id, import_folder, mode).await {
            Ok(true) => ImportOutcome {
                success: true,
                message: format!("Import command sent for {}", import_folder),
            },
            Ok(false) => ImportOutcome {
                success: false,
                message: "Catalog source did not accept the import".to_string(),
            },
            Err(e) => {
                tracing::error!(album_id, error = %e, "Import command failed");
                ImportOutcome {
                    success: false,
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Folder part of a path using either separator; the path itself when it has none.
fn parent_folder(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) if idx > 0 => &path[..idx],
        _ => path,
    }
}

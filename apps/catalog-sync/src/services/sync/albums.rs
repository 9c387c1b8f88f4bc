//! Album stage: create new albums and promote existing ones to downloaded.

use std::sync::Arc;

use super::StageStats;
use crate::db::models::{Album, Artist, NewAlbum};
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::services::catalog_source::{AlbumRecord, CatalogSource};
use crate::services::genre::GenreResolver;

/// What reconciling one album did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlbumChange {
    Created,
    MarkedDownloaded,
    Unchanged,
}

pub struct AlbumReconciler {
    store: CatalogStore,
    source: Arc<dyn CatalogSource>,
    genres: GenreResolver,
}

impl AlbumReconciler {
    pub fn new(store: CatalogStore, source: Arc<dyn CatalogSource>, genres: GenreResolver) -> Self {
        Self {
            store,
            source,
            genres,
        }
    }

    /// Reconcile albums for every stored artist.
    ///
    /// Only a failure to list local artists aborts the stage.
    pub async fn reconcile_all(&self) -> Result<StageStats> {
        let mut stats = StageStats::default();
        for artist in self.store.list_artists().await? {
            self.reconcile_for_artist(&artist, &mut stats).await;
        }
        Ok(stats)
    }

    pub async fn reconcile_for_artist(&self, artist: &Artist, stats: &mut StageStats) {
        let Some(lidarr_id) = artist.lidarr_id else {
            tracing::debug!(artist_id = artist.id, "Artist has no catalog source ID, skipping albums");
            stats.skipped += 1;
            return;
        };

        let records = match self.source.list_albums(lidarr_id).await {
            Ok(records) => records,
            Err(e) => {
                stats.failed += 1;
                tracing::error!(artist_id = artist.id, lidarr_id, error = %e, "Failed to fetch albums");
                return;
            }
        };

        for record in &records {
            match self.reconcile_album(artist, record).await {
                Ok(AlbumChange::Created) => stats.created += 1,
                Ok(AlbumChange::MarkedDownloaded) => stats.updated += 1,
                Ok(AlbumChange::Unchanged) => stats.unchanged += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(
                        artist_id = artist.id,
                        lidarr_album_id = ?record.id,
                        title = ?record.title,
                        error = %e,
                        "Failed to reconcile album"
                    );
                }
            }
        }
    }

    async fn reconcile_album(&self, artist: &Artist, record: &AlbumRecord) -> Result<AlbumChange> {
        let lidarr_album_id = record
            .id
            .ok_or_else(|| AppError::MissingField("album.id".to_string()))?;

        match self.store.find_album_by_lidarr_id(lidarr_album_id).await? {
            Some(existing) => self.update_existing(&existing, record).await,
            None => self.create(artist, lidarr_album_id, record).await,
        }
    }

    /// Only the downloaded flag follows the source, and only towards true.
    async fn update_existing(&self, album: &Album, record: &AlbumRecord) -> Result<AlbumChange> {
        let statistics = record
            .statistics
            .as_ref()
            .ok_or_else(|| AppError::MissingField("album.statistics".to_string()))?;

        if statistics.is_complete() && !album.downloaded {
            self.store.set_album_downloaded(album.id, true).await?;
            tracing::info!(album_id = album.id, title = %album.title, "Album marked as downloaded");
            return Ok(AlbumChange::MarkedDownloaded);
        }

        Ok(AlbumChange::Unchanged)
    }

    async fn create(
        &self,
        artist: &Artist,
        lidarr_album_id: i64,
        record: &AlbumRecord,
    ) -> Result<AlbumChange> {
        let title = record
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| AppError::MissingField("album.title".to_string()))?;

        let downloaded = record
            .statistics
            .as_ref()
            .and_then(|stats| stats.has_files())
            .unwrap_or(false);

        let (album, created) = self
            .store
            .insert_album(&NewAlbum {
                lidarr_album_id,
                artist_id: artist.id,
                title: title.to_string(),
                album_type: record.album_type.clone(),
                release_date: record.parsed_release_date(),
                cover_image_url: record.cover_art(),
                foreign_album_id: record.foreign_album_id.clone(),
                legacy_album_id: record.legacy_album_id(),
                monitored_release_id: record.monitored_release_id(),
                downloaded,
            })
            .await?;

        if !created {
            return Ok(AlbumChange::Unchanged);
        }

        self.attach_genres(&album, &record.genres).await;

        tracing::info!(
            album_id = album.id,
            lidarr_album_id,
            title = %album.title,
            downloaded,
            "Created album"
        );
        Ok(AlbumChange::Created)
    }

    async fn attach_genres(&self, album: &Album, names: &[String]) {
        for name in names {
            if name.trim().is_empty() {
                tracing::debug!(album_id = album.id, "Skipping blank genre name");
                continue;
            }
            let attached = match self.genres.resolve(name).await {
                Ok(genre) => self.store.attach_album_genre(album.id, genre.id).await,
                Err(e) => Err(e),
            };
            if let Err(e) = attached {
                tracing::warn!(album_id = album.id, genre = %name, error = %e, "Failed to attach genre");
            }
        }
    }
}

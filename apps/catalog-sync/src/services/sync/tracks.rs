//! Track stage: create tracks for downloaded albums and locate their files.

use std::sync::Arc;

use super::StageStats;
use crate::db::models::{AlbumWithArtist, NewTrack};
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::services::catalog_source::{CatalogSource, TrackRecord};
use crate::services::locator::FileLocator;

pub struct TrackReconciler {
    store: CatalogStore,
    source: Arc<dyn CatalogSource>,
    locator: FileLocator,
}

impl TrackReconciler {
    pub fn new(store: CatalogStore, source: Arc<dyn CatalogSource>, locator: FileLocator) -> Self {
        Self {
            store,
            source,
            locator,
        }
    }

    pub async fn reconcile_all(&self) -> Result<StageStats> {
        let mut stats = StageStats::default();
        for entry in self.store.list_albums_with_artist().await? {
            self.reconcile_for_album(&entry, &mut stats).await;
        }
        Ok(stats)
    }

    /// Albums that are not downloaded, or lack source IDs, are skipped.
    pub async fn reconcile_for_album(&self, entry: &AlbumWithArtist, stats: &mut StageStats) {
        let AlbumWithArtist { album, artist } = entry;
        if !album.downloaded {
            return;
        }
        let (Some(artist_lidarr_id), Some(album_lidarr_id)) =
            (artist.lidarr_id, album.lidarr_album_id)
        else {
            tracing::debug!(album_id = album.id, "Album has no catalog source IDs, skipping tracks");
            stats.skipped += 1;
            return;
        };

        let records = match self
            .source
            .list_tracks(artist_lidarr_id, album_lidarr_id, album.monitored_release_id)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                stats.failed += 1;
                tracing::error!(album_id = album.id, error = %e, "Failed to fetch tracks");
                return;
            }
        };

        for record in &records {
            match self.reconcile_track(entry, record).await {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.unchanged += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(
                        album_id = album.id,
                        lidarr_track_id = ?record.id,
                        error = %e,
                        "Failed to reconcile track"
                    );
                }
            }
        }
    }

    async fn reconcile_track(&self, entry: &AlbumWithArtist, record: &TrackRecord) -> Result<bool> {
        let lidarr_track_id = record
            .id
            .ok_or_else(|| AppError::MissingField("track.id".to_string()))?;

        if self
            .store
            .find_track_by_lidarr_id(lidarr_track_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let title = record
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .ok_or_else(|| AppError::MissingField("track.title".to_string()))?;
        let track_number = record.absolute_track_number.unwrap_or(0);

        let audio_path = self
            .locator
            .locate(&entry.artist.name, &entry.album.title, title, track_number)
            .await;

        let (track, created) = self
            .store
            .insert_track(&NewTrack {
                lidarr_track_id,
                album_id: entry.album.id,
                title: title.to_string(),
                duration_secs: record.duration.unwrap_or(0),
                track_number,
                disc_number: record.medium_number.unwrap_or(1),
                explicit: record.explicit.unwrap_or(false),
                audio_path: Some(audio_path),
            })
            .await?;

        if created {
            tracing::debug!(
                track_id = track.id,
                album_id = entry.album.id,
                path = ?track.audio_path,
                "Created track"
            );
        }
        Ok(created)
    }
}

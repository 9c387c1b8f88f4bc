//! Artist stage: mirror every source artist that is not yet stored locally.

use std::sync::Arc;

use super::StageStats;
use crate::db::models::{Artist, NewArtist};
use crate::db::CatalogStore;
use crate::error::{AppError, Result};
use crate::services::catalog_source::{ArtistRecord, CatalogSource};
use crate::services::genre::GenreResolver;

pub struct ArtistReconciler {
    store: CatalogStore,
    source: Arc<dyn CatalogSource>,
    genres: GenreResolver,
}

impl ArtistReconciler {
    pub fn new(store: CatalogStore, source: Arc<dyn CatalogSource>, genres: GenreResolver) -> Self {
        Self {
            store,
            source,
            genres,
        }
    }

    /// Create local rows for source artists not seen before.
    ///
    /// Existing artists are left untouched. A failing artist is logged and
    /// counted; the others still go through.
    pub async fn reconcile_all(&self) -> StageStats {
        let mut stats = StageStats::default();

        let records = match self.source.list_artists().await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch artists from catalog source");
                return stats;
            }
        };

        tracing::debug!(count = records.len(), "Reconciling artists");

        for record in &records {
            match self.reconcile_one(record).await {
                Ok(true) => stats.created += 1,
                Ok(false) => stats.unchanged += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::error!(
                        lidarr_id = ?record.id,
                        artist = ?record.artist_name,
                        error = %e,
                        "Failed to reconcile artist"
                    );
                }
            }
        }

        stats
    }

    async fn reconcile_one(&self, record: &ArtistRecord) -> Result<bool> {
        let lidarr_id = record
            .id
            .ok_or_else(|| AppError::MissingField("artist.id".to_string()))?;

        if self.store.find_artist_by_lidarr_id(lidarr_id).await?.is_some() {
            return Ok(false);
        }

        let (_, created) = self.create_from_record(record, None).await?;
        Ok(created)
    }

    /// Store a source artist locally and attach its genres.
    ///
    /// `fallback_name` is used when the record carries no name.
    pub async fn create_from_record(
        &self,
        record: &ArtistRecord,
        fallback_name: Option<&str>,
    ) -> Result<(Artist, bool)> {
        let lidarr_id = record
            .id
            .ok_or_else(|| AppError::MissingField("artist.id".to_string()))?;
        let name = record
            .artist_name
            .as_deref()
            .or(fallback_name)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::MissingField("artist.artistName".to_string()))?;

        let image_url = record.first_image_url();
        if image_url.is_none() {
            tracing::debug!(lidarr_id, "Artist has no image");
        }

        let (artist, created) = self
            .store
            .insert_artist(&NewArtist {
                lidarr_id,
                foreign_id: record.foreign_artist_id.clone(),
                name: name.to_string(),
                biography: record.overview.clone(),
                image_url,
            })
            .await?;

        if created {
            tracing::info!(artist_id = artist.id, lidarr_id, name = %artist.name, "Created artist");
            self.attach_genres(&artist, &record.genres).await;
        }

        Ok((artist, created))
    }

    async fn attach_genres(&self, artist: &Artist, names: &[String]) {
        for name in names {
            if name.trim().is_empty() {
                continue;
            }
            let attached = match self.genres.resolve(name).await {
                Ok(genre) => self.store.attach_artist_genre(artist.id, genre.id).await,
                Err(e) => Err(e),
            };
            if let Err(e) = attached {
                tracing::warn!(artist_id = artist.id, genre = %name, error = %e, "Failed to attach genre");
            }
        }
    }
}

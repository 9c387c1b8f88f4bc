//! Catalog source: the external service of record the local mirror follows.
//!
//! The reconcilers only see the [`CatalogSource`] trait; [`LidarrClient`]
//! is the production implementation over the Lidarr v1 REST API.

pub mod lidarr;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
pub use lidarr::LidarrClient;
pub use types::{
    AddArtistRequest, AddOptions, AlbumRecord, AlbumStatistics, ArtistRecord, ImageRecord,
    ImportCandidate, ImportMode, ImportOutcome, QueueStatus, ReleaseRecord, TrackRecord,
};

/// Read/write access to the external catalog manager.
///
/// Implementations return `Err` on transport, status or decode failures and
/// leave it to callers to decide whether a failure is fatal.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// All artists known to the source.
    async fn list_artists(&self) -> Result<Vec<ArtistRecord>>;

    /// A single artist by external ID, `None` when the source does not know it.
    async fn get_artist(&self, artist_id: i64) -> Result<Option<ArtistRecord>>;

    /// Artists matching a cross-service foreign identifier.
    async fn find_artists_by_foreign_id(&self, foreign_id: &str) -> Result<Vec<ArtistRecord>>;

    /// Register a new artist with the source.
    async fn add_artist(&self, request: &AddArtistRequest) -> Result<ArtistRecord>;

    /// Albums of one artist.
    async fn list_albums(&self, artist_id: i64) -> Result<Vec<AlbumRecord>>;

    /// Tracks of one album, optionally scoped to a single release.
    async fn list_tracks(
        &self,
        artist_id: i64,
        album_id: i64,
        release_id: Option<i64>,
    ) -> Result<Vec<TrackRecord>>;

    /// Flip the album's monitored flag. Returns whether the source accepted it.
    async fn set_album_monitored(&self, album_id: i64, monitored: bool) -> Result<bool>;

    /// Ask the source to search its indexers for the album.
    async fn trigger_album_search(&self, album_id: i64) -> Result<bool>;

    /// Current download queue state of the album.
    async fn album_queue_status(&self, album_id: i64) -> Result<QueueStatus>;

    /// Files in `folder` the source could import.
    async fn manual_import_candidates(
        &self,
        folder: &str,
        filter_existing_files: bool,
        replace_existing_files: bool,
    ) -> Result<Vec<ImportCandidate>>;

    /// Ask the source to import a folder into the album.
    async fn import_album(&self, album_id: i64, folder: &str, mode: ImportMode) -> Result<bool>;
}

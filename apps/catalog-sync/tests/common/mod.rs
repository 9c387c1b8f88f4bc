//! Test infrastructure for catalog sync integration tests.
//!
//! Provides a scripted `FakeSource` standing in for the catalog manager, and a
//! `TestApp` wiring it to an in-memory database, a temporary media root and
//! an `axum_test::TestServer`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

use catalog_sync::config::CatalogSourceConfig;
use catalog_sync::db::{self, CatalogStore};
use catalog_sync::error::{AppError, Result};
use catalog_sync::services::catalog_source::{
    AddArtistRequest, AlbumRecord, ArtistRecord, CatalogSource, ImportCandidate, ImportMode,
    QueueStatus, TrackRecord,
};
use catalog_sync::services::{FileLocator, SyncEngine};
use catalog_sync::{router, AppState};

// =============================================================================
// Fake Catalog Source
// =============================================================================

/// Scripted catalog source state. Tests mutate it through `FakeSource::with`.
#[derive(Default)]
pub struct FakeState {
    pub artists: Vec<ArtistRecord>,
    /// Albums keyed by artist external ID
    pub albums: HashMap<i64, Vec<AlbumRecord>>,
    /// Tracks keyed by album external ID
    pub tracks: HashMap<i64, Vec<TrackRecord>>,
    pub fail_list_artists: bool,
    pub fail_albums_for: HashSet<i64>,
    pub fail_monitor: bool,
    pub fail_search: bool,
    pub list_artists_delay: Option<Duration>,
    pub queue_details: Value,
    pub import_candidates: Vec<ImportCandidate>,

    // Recorded calls
    pub list_artists_calls: usize,
    pub track_queries: Vec<(i64, i64, Option<i64>)>,
    pub added_artists: Vec<AddArtistRequest>,
    pub monitor_calls: Vec<(i64, bool)>,
    pub search_calls: Vec<i64>,
    pub imports: Vec<(i64, String, ImportMode)>,
}

#[derive(Default)]
pub struct FakeSource {
    state: StdMutex<FakeState>,
}

impl FakeSource {
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Run `f` against the scripted state.
    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("fake source state poisoned");
        f(&mut state)
    }

    pub fn add_artist_record(&self, artist: ArtistRecord) {
        self.with(|s| s.artists.push(artist));
    }

    pub fn set_albums(&self, artist_id: i64, albums: Vec<AlbumRecord>) {
        self.with(|s| {
            s.albums.insert(artist_id, albums);
        });
    }

    pub fn set_tracks(&self, album_id: i64, tracks: Vec<TrackRecord>) {
        self.with(|s| {
            s.tracks.insert(album_id, tracks);
        });
    }
}

#[async_trait]
impl CatalogSource for FakeSource {
    async fn list_artists(&self) -> Result<Vec<ArtistRecord>> {
        let delay = self.with(|s| {
            s.list_artists_calls += 1;
            s.list_artists_delay
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.with(|s| {
            if s.fail_list_artists {
                Err(AppError::Source("connection refused".to_string()))
            } else {
                Ok(s.artists.clone())
            }
        })
    }

    async fn get_artist(&self, artist_id: i64) -> Result<Option<ArtistRecord>> {
        Ok(self.with(|s| s.artists.iter().find(|a| a.id == Some(artist_id)).cloned()))
    }

    async fn find_artists_by_foreign_id(&self, foreign_id: &str) -> Result<Vec<ArtistRecord>> {
        Ok(self.with(|s| {
            s.artists
                .iter()
                .filter(|a| a.foreign_artist_id.as_deref() == Some(foreign_id))
                .cloned()
                .collect()
        }))
    }

    async fn add_artist(&self, request: &AddArtistRequest) -> Result<ArtistRecord> {
        Ok(self.with(|s| {
            s.added_artists.push(request.clone());
            let next_id = s.artists.iter().filter_map(|a| a.id).max().unwrap_or(0) + 1;
            let record = ArtistRecord {
                id: Some(next_id),
                artist_name: Some(request.artist_name.clone()),
                foreign_artist_id: Some(request.foreign_artist_id.clone()),
                monitored: Some(request.add_options.monitored),
                ..Default::default()
            };
            s.artists.push(record.clone());
            record
        }))
    }

    async fn list_albums(&self, artist_id: i64) -> Result<Vec<AlbumRecord>> {
        self.with(|s| {
            if s.fail_albums_for.contains(&artist_id) {
                return Err(AppError::Source("timeout".to_string()));
            }
            Ok(s.albums.get(&artist_id).cloned().unwrap_or_default())
        })
    }

    async fn list_tracks(
        &self,
        artist_id: i64,
        album_id: i64,
        release_id: Option<i64>,
    ) -> Result<Vec<TrackRecord>> {
        Ok(self.with(|s| {
            s.track_queries.push((artist_id, album_id, release_id));
            s.tracks.get(&album_id).cloned().unwrap_or_default()
        }))
    }

    async fn set_album_monitored(&self, album_id: i64, monitored: bool) -> Result<bool> {
        self.with(|s| {
            if s.fail_monitor {
                return Err(AppError::Source("album not found".to_string()));
            }
            s.monitor_calls.push((album_id, monitored));
            Ok(true)
        })
    }

    async fn trigger_album_search(&self, album_id: i64) -> Result<bool> {
        self.with(|s| {
            if s.fail_search {
                return Err(AppError::Source("command rejected".to_string()));
            }
            s.search_calls.push(album_id);
            Ok(true)
        })
    }

    async fn album_queue_status(&self, _album_id: i64) -> Result<QueueStatus> {
        Ok(self.with(|s| QueueStatus::from_queue_details(&s.queue_details)))
    }

    async fn manual_import_candidates(
        &self,
        _folder: &str,
        _filter_existing_files: bool,
        _replace_existing_files: bool,
    ) -> Result<Vec<ImportCandidate>> {
        Ok(self.with(|s| s.import_candidates.clone()))
    }

    async fn import_album(&self, album_id: i64, folder: &str, mode: ImportMode) -> Result<bool> {
        self.with(|s| s.imports.push((album_id, folder.to_string(), mode)));
        Ok(true)
    }
}

// =============================================================================
// Record Builders
// =============================================================================

pub fn artist(id: i64, name: &str, foreign_id: &str, genres: &[&str]) -> ArtistRecord {
    serde_json::from_value(json!({
        "id": id,
        "artistName": name,
        "foreignArtistId": foreign_id,
        "overview": format!("About {}", name),
        "genres": genres,
        "images": [{ "coverType": "poster", "remoteUrl": format!("http://img/{}.jpg", id) }]
    }))
    .expect("valid artist record")
}

/// An album with both statistics counts set.
pub fn album(id: i64, title: &str, track_files: i64, tracks: i64) -> AlbumRecord {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "albumType": "Album",
        "releaseDate": "1997-05-21T00:00:00Z",
        "foreignAlbumId": format!("rg-{}", id),
        "genres": ["Alternative"],
        "images": [{ "coverType": "cover", "remoteUrl": format!("http://img/album-{}.jpg", id) }],
        "releases": [{ "id": id * 10, "albumId": id, "monitored": true }],
        "statistics": { "trackFileCount": track_files, "trackCount": tracks }
    }))
    .expect("valid album record")
}

pub fn track(id: i64, title: &str, number: i32) -> TrackRecord {
    serde_json::from_value(json!({
        "id": id,
        "title": title,
        "duration": 240,
        "absoluteTrackNumber": number,
        "mediumNumber": 1,
        "explicit": false
    }))
    .expect("valid track record")
}

// =============================================================================
// Test Harness
// =============================================================================

/// Engine, store and fake source over an in-memory database.
pub struct TestEngine {
    pub engine: Arc<SyncEngine>,
    pub store: CatalogStore,
    pub source: Arc<FakeSource>,
    pub media: TempDir,
}

impl TestEngine {
    pub fn new() -> Self {
        let conn = db::init_db_memory().expect("Failed to initialize test database");
        let store = CatalogStore::new(Arc::new(Mutex::new(conn)));
        let source = FakeSource::new_shared();
        let media = TempDir::new().expect("Failed to create media root");

        let engine = SyncEngine::new_shared(
            store.clone(),
            source.clone(),
            FileLocator::new(media.path()),
            CatalogSourceConfig::default(),
        );

        Self {
            engine,
            store,
            source,
            media,
        }
    }
}

/// Test application wrapper around axum_test::TestServer.
pub struct TestApp {
    server: TestServer,
    pub harness: TestEngine,
}

impl TestApp {
    /// Create a new test application with in-memory database and fake source.
    ///
    /// The scheduler is left out so passes only run when a test asks for one.
    pub async fn new() -> Self {
        let harness = TestEngine::new();

        let state = AppState {
            engine: Arc::clone(&harness.engine),
            start_time: std::time::Instant::now(),
        };

        let server = TestServer::new(router(state)).expect("Failed to create test server");

        Self { server, harness }
    }

    pub fn server(&self) -> &TestServer {
        &self.server
    }

    pub fn source(&self) -> &FakeSource {
        &self.harness.source
    }
}

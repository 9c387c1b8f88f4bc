//! Integration tests for reconciliation passes and source operations.

mod common;

use chrono::NaiveDate;
use serde_json::json;
use std::fs;
use std::time::Duration;

use catalog_sync::services::catalog_source::{AlbumRecord, ImportCandidate, ImportMode, TrackRecord};
use common::{album, artist, track, TestEngine};

const RADIOHEAD_MBID: &str = "a74b1b7f-71a5-4011-9441-d0b5e4122711";

/// One artist with one fully downloaded album of two tracks.
fn seed_downloaded_album(t: &TestEngine) {
    t.source
        .add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &["Rock", "Alternative"]));
    t.source.set_albums(1, vec![album(100, "OK Computer", 2, 2)]);
    t.source.set_tracks(
        100,
        vec![track(1000, "Airbag", 1), track(1001, "Paranoid Android", 2)],
    );
}

// =============================================================================
// Full Pass
// =============================================================================

#[tokio::test]
async fn test_full_sync_mirrors_catalog() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);

    let report = t.engine.run_full_sync().await.expect("pass should run");
    assert!(report.succeeded());
    assert_eq!(report.artists.created, 1);
    assert_eq!(report.albums.created, 1);
    assert_eq!(report.tracks.created, 2);

    let artist = t.store.find_artist_by_lidarr_id(1).await.unwrap().unwrap();
    assert_eq!(artist.name, "Radiohead");
    assert_eq!(artist.foreign_id.as_deref(), Some(RADIOHEAD_MBID));
    assert_eq!(artist.image_url.as_deref(), Some("http://img/1.jpg"));

    let album = t.store.find_album_by_lidarr_id(100).await.unwrap().unwrap();
    assert_eq!(album.artist_id, artist.id);
    assert!(album.downloaded);
    assert_eq!(album.release_date, NaiveDate::from_ymd_opt(1997, 5, 21));
    assert_eq!(album.cover_image_url.as_deref(), Some("http://img/album-100.jpg"));
    assert_eq!(album.legacy_album_id, Some(100));
    assert_eq!(album.monitored_release_id, Some(1000));

    let tracks = t.store.tracks_for_album(album.id).await.unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].title, "Airbag");
    assert_eq!(tracks[0].duration_secs, 240);
    assert_eq!(tracks[0].disc_number, 1);

    let last = t.engine.last_report().await.expect("report recorded");
    assert_eq!(last.tracks.created, 2);
}

#[tokio::test]
async fn test_full_sync_is_idempotent() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);

    t.engine.run_full_sync().await.unwrap();
    let first = t.store.counts().await.unwrap();

    let report = t.engine.run_full_sync().await.unwrap();
    let second = t.store.counts().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(report.artists.created, 0);
    assert_eq!(report.artists.unchanged, 1);
    assert_eq!(report.albums.created, 0);
    assert_eq!(report.tracks.created, 0);
    assert_eq!(report.tracks.unchanged, 2);
}

#[tokio::test]
async fn test_incremental_sync_runs_full_pass() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);

    let report = t.engine.run_incremental_sync().await.unwrap();
    assert_eq!(report.artists.created, 1);
    assert_eq!(report.tracks.created, 2);
}

#[tokio::test]
async fn test_source_failure_yields_empty_pass() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);
    t.source.with(|s| s.fail_list_artists = true);

    let report = t.engine.run_full_sync().await.unwrap();

    assert!(report.succeeded());
    assert_eq!(report.artists.created, 0);
    assert_eq!(t.store.counts().await.unwrap().artists, 0);
}

// =============================================================================
// Artists
// =============================================================================

#[tokio::test]
async fn test_existing_artist_is_not_modified() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);
    t.engine.run_full_sync().await.unwrap();

    t.source.with(|s| s.artists[0].artist_name = Some("Radiohead (renamed)".to_string()));
    t.engine.run_full_sync().await.unwrap();

    let artist = t.store.find_artist_by_lidarr_id(1).await.unwrap().unwrap();
    assert_eq!(artist.name, "Radiohead");
}

#[tokio::test]
async fn test_artist_without_images_gets_no_image() {
    let t = TestEngine::new();
    let mut record = artist(2, "Portishead", "8f6bd1e4", &[]);
    record.images.clear();
    t.source.add_artist_record(record);

    let report = t.engine.run_full_sync().await.unwrap();

    assert_eq!(report.artists.created, 1);
    let artist = t.store.find_artist_by_lidarr_id(2).await.unwrap().unwrap();
    assert_eq!(artist.image_url, None);
}

#[tokio::test]
async fn test_genres_canonicalized_across_entities() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", "mbid-1", &["Rock"]));
    t.source.add_artist_record(artist(2, "Muse", "mbid-2", &["rock"]));
    t.source.add_artist_record(artist(3, "Foo Fighters", "mbid-3", &["ROCK", " "]));

    t.engine.run_full_sync().await.unwrap();

    let counts = t.store.counts().await.unwrap();
    assert_eq!(counts.genres, 1);

    let muse = t.store.find_artist_by_lidarr_id(2).await.unwrap().unwrap();
    let genres = t.store.artist_genres(muse.id).await.unwrap();
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0].name, "Rock");
}

#[tokio::test]
async fn test_album_genres_share_artist_genre() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &["ROCK"]));

    let mut record = album(100, "OK Computer", 0, 12);
    record.genres = vec!["Rock".to_string(), "rock".to_string(), " ".to_string()];
    t.source.set_albums(1, vec![record]);

    t.engine.run_full_sync().await.unwrap();

    let radiohead = t.store.find_artist_by_lidarr_id(1).await.unwrap().unwrap();
    let artist_genres = t.store.artist_genres(radiohead.id).await.unwrap();
    let stored = t.store.find_album_by_lidarr_id(100).await.unwrap().unwrap();
    let album_genres = t.store.album_genres(stored.id).await.unwrap();

    assert_eq!(album_genres.len(), 1);
    assert_eq!(album_genres[0].id, artist_genres[0].id);
    // The artist stage ran first, so its casing is the stored one
    assert_eq!(album_genres[0].name, "ROCK");
    assert_eq!(t.store.counts().await.unwrap().genres, 1);
}

// =============================================================================
// Albums
// =============================================================================

#[tokio::test]
async fn test_partial_failure_isolated_to_album() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));

    let mut broken = album(102, "placeholder", 0, 10);
    broken.title = None;
    t.source.set_albums(
        1,
        vec![
            album(101, "Pablo Honey", 0, 12),
            broken,
            album(103, "The Bends", 0, 12),
        ],
    );

    let report = t.engine.run_full_sync().await.unwrap();

    assert_eq!(report.albums.created, 2);
    assert_eq!(report.albums.failed, 1);
    assert!(t.store.find_album_by_lidarr_id(101).await.unwrap().is_some());
    assert!(t.store.find_album_by_lidarr_id(102).await.unwrap().is_none());
    assert!(t.store.find_album_by_lidarr_id(103).await.unwrap().is_some());
}

#[tokio::test]
async fn test_album_fetch_failure_isolated_to_artist() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", "mbid-1", &[]));
    t.source.add_artist_record(artist(2, "Muse", "mbid-2", &[]));
    t.source.set_albums(1, vec![album(101, "Pablo Honey", 0, 12)]);
    t.source.set_albums(2, vec![album(201, "Showbiz", 0, 12)]);
    t.source.with(|s| {
        s.fail_albums_for.insert(1);
    });

    let report = t.engine.run_full_sync().await.unwrap();

    assert_eq!(report.albums.created, 1);
    assert!(t.store.find_album_by_lidarr_id(201).await.unwrap().is_some());
}

#[tokio::test]
async fn test_downloaded_flag_on_create_uses_any_files() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));
    t.source.set_albums(
        1,
        vec![album(101, "Partial", 3, 12), album(102, "Empty", 0, 12)],
    );

    t.engine.run_full_sync().await.unwrap();

    assert!(t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);
    assert!(!t.store.find_album_by_lidarr_id(102).await.unwrap().unwrap().downloaded);
}

#[tokio::test]
async fn test_existing_album_promoted_when_complete_and_never_demoted() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));
    t.source.set_albums(1, vec![album(101, "Kid A", 0, 10)]);
    t.engine.run_full_sync().await.unwrap();
    assert!(!t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);

    // Partial files on an existing album do not promote it
    t.source.set_albums(1, vec![album(101, "Kid A", 5, 10)]);
    t.engine.run_full_sync().await.unwrap();
    assert!(!t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);

    t.source.set_albums(1, vec![album(101, "Kid A", 10, 10)]);
    let report = t.engine.run_full_sync().await.unwrap();
    assert_eq!(report.albums.updated, 1);
    assert!(t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);

    t.source.set_albums(1, vec![album(101, "Kid A", 0, 10)]);
    t.engine.run_full_sync().await.unwrap();
    assert!(t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);
}

#[tokio::test]
async fn test_existing_album_without_statistics_fails() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));
    t.source.set_albums(1, vec![album(101, "Amnesiac", 0, 11)]);
    t.engine.run_full_sync().await.unwrap();

    let mut without_stats = album(101, "Amnesiac", 11, 11);
    without_stats.statistics = None;
    t.source.set_albums(1, vec![without_stats]);

    let report = t.engine.run_full_sync().await.unwrap();
    assert_eq!(report.albums.failed, 1);
    assert!(!t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap().downloaded);
}

#[tokio::test]
async fn test_monitored_release_selection() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));

    let record: AlbumRecord = serde_json::from_value(json!({
        "id": 101,
        "title": "In Rainbows",
        "releaseDate": "not a date",
        "releases": [
            { "id": 501, "albumId": 77, "monitored": false },
            { "id": 502, "albumId": 77, "monitored": true },
            { "id": 503, "albumId": 77, "monitored": false }
        ],
        "statistics": { "trackFileCount": 0, "trackCount": 10 }
    }))
    .unwrap();
    t.source.set_albums(1, vec![record]);

    t.engine.run_full_sync().await.unwrap();

    let album = t.store.find_album_by_lidarr_id(101).await.unwrap().unwrap();
    assert_eq!(album.monitored_release_id, Some(502));
    assert_eq!(album.legacy_album_id, Some(77));
    assert_eq!(album.release_date, None);
    assert_eq!(album.cover_image_url, None);
}

// =============================================================================
// Tracks
// =============================================================================

#[tokio::test]
async fn test_tracks_only_for_downloaded_albums() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));
    t.source.set_albums(1, vec![album(101, "Hail to the Thief", 0, 14)]);
    t.source.set_tracks(101, vec![track(1, "2 + 2 = 5", 1)]);

    let report = t.engine.run_full_sync().await.unwrap();

    assert_eq!(report.tracks.created, 0);
    assert_eq!(t.store.counts().await.unwrap().tracks, 0);
    assert!(t.source.with(|s| s.track_queries.is_empty()));
}

#[tokio::test]
async fn test_track_lookup_scoped_to_monitored_release() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);

    t.engine.run_full_sync().await.unwrap();

    let queries = t.source.with(|s| s.track_queries.clone());
    assert_eq!(queries, vec![(1, 100, Some(1000))]);
}

#[tokio::test]
async fn test_track_defaults_and_failures() {
    let t = TestEngine::new();
    t.source.add_artist_record(artist(1, "Radiohead", RADIOHEAD_MBID, &[]));
    t.source.set_albums(1, vec![album(100, "OK Computer", 2, 2)]);

    let sparse: TrackRecord = serde_json::from_value(json!({ "id": 1, "title": "Lucky" })).unwrap();
    let untitled: TrackRecord = serde_json::from_value(json!({ "id": 2 })).unwrap();
    t.source.set_tracks(100, vec![sparse, untitled]);

    let report = t.engine.run_full_sync().await.unwrap();
    assert_eq!(report.tracks.created, 1);
    assert_eq!(report.tracks.failed, 1);

    let track = t.store.find_track_by_lidarr_id(1).await.unwrap().unwrap();
    assert_eq!(track.duration_secs, 0);
    assert_eq!(track.track_number, 0);
    assert_eq!(track.disc_number, 1);
    assert!(!track.explicit);
}

#[tokio::test]
async fn test_track_audio_path_resolution() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);

    let album_dir = t.media.path().join("Radiohead").join("OK Computer");
    fs::create_dir_all(&album_dir).unwrap();
    fs::write(album_dir.join("01 - Airbag.mp3"), b"audio").unwrap();

    t.engine.run_full_sync().await.unwrap();

    let airbag = t.store.find_track_by_lidarr_id(1000).await.unwrap().unwrap();
    let android = t.store.find_track_by_lidarr_id(1001).await.unwrap().unwrap();

    let airbag_path = airbag.audio_path.unwrap();
    let android_path = android.audio_path.unwrap();
    assert!(airbag_path.ends_with("01 - Airbag.mp3"), "{}", airbag_path);
    assert!(
        android_path.ends_with("02 - Paranoid Android.flac"),
        "{}",
        android_path
    );
}

// =============================================================================
// Run-lock
// =============================================================================

#[tokio::test]
async fn test_overlapping_pass_is_skipped() {
    let t = TestEngine::new();
    seed_downloaded_album(&t);
    t.source
        .with(|s| s.list_artists_delay = Some(Duration::from_millis(200)));

    let engine = t.engine.clone();
    let first = tokio::spawn(async move { engine.run_full_sync().await });

    // Let the first pass take the lock
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(t.engine.is_running());
    let second = t.engine.run_full_sync().await;

    assert!(second.is_none());
    let first = first.await.unwrap();
    assert!(first.is_some());
    assert_eq!(t.source.with(|s| s.list_artists_calls), 1);
    assert_eq!(t.store.counts().await.unwrap().artists, 1);
}

// =============================================================================
// Source Operations
// =============================================================================

#[tokio::test]
async fn test_onboard_artist_adds_to_source_and_mirror() {
    let t = TestEngine::new();

    let record = t
        .engine
        .onboard_artist("Radiohead", RADIOHEAD_MBID)
        .await
        .unwrap();

    assert_eq!(record.id, Some(1));
    let added = t.source.with(|s| s.added_artists.clone());
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].quality_profile_id, 1);
    assert_eq!(added[0].metadata_profile_id, 1);
    assert_eq!(added[0].root_folder_path, "/media");
    assert_eq!(added[0].add_options.monitor, "none");
    assert!(!added[0].add_options.search_for_missing_albums);
    assert!(added[0].add_options.monitored);

    let local = t
        .store
        .find_artist_by_foreign_id(RADIOHEAD_MBID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local.lidarr_id, Some(1));
    assert_eq!(local.image_url, None);
}

#[tokio::test]
async fn test_onboard_artist_is_idempotent() {
    let t = TestEngine::new();

    let first = t.engine.onboard_artist("Radiohead", RADIOHEAD_MBID).await.unwrap();
    let second = t.engine.onboard_artist("Radiohead", RADIOHEAD_MBID).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(t.source.with(|s| s.added_artists.len()), 1);
    assert_eq!(t.store.counts().await.unwrap().artists, 1);
}

#[tokio::test]
async fn test_onboard_artist_known_to_source_is_not_re_added() {
    let t = TestEngine::new();
    t.source
        .add_artist_record(artist(7, "Radiohead", RADIOHEAD_MBID, &["Rock"]));

    let record = t.engine.onboard_artist("Radiohead", RADIOHEAD_MBID).await.unwrap();

    assert_eq!(record.id, Some(7));
    assert!(t.source.with(|s| s.added_artists.is_empty()));
    assert!(t.store.find_artist_by_lidarr_id(7).await.unwrap().is_some());
}

#[tokio::test]
async fn test_request_album_download() {
    let t = TestEngine::new();

    assert!(t.engine.request_album_download(42).await);
    assert_eq!(t.source.with(|s| s.monitor_calls.clone()), vec![(42, true)]);
    assert_eq!(t.source.with(|s| s.search_calls.clone()), vec![42]);
}

#[tokio::test]
async fn test_request_album_download_search_failure_still_accepted() {
    let t = TestEngine::new();
    t.source.with(|s| s.fail_search = true);

    assert!(t.engine.request_album_download(42).await);
}

#[tokio::test]
async fn test_request_album_download_monitor_failure() {
    let t = TestEngine::new();
    t.source.with(|s| s.fail_monitor = true);

    assert!(!t.engine.request_album_download(42).await);
    assert!(t.source.with(|s| s.search_calls.is_empty()));
}

#[tokio::test]
async fn test_album_download_status() {
    let t = TestEngine::new();

    let status = t.engine.album_download_status(42).await;
    assert_eq!(status.status, "not_in_queue");

    t.source.with(|s| {
        s.queue_details = json!([{ "status": "downloading", "size": 400, "sizeleft": 100 }])
    });
    let status = t.engine.album_download_status(42).await;
    assert_eq!(status.status, "downloading");
    assert_eq!(status.progress, 75.0);
}

#[tokio::test]
async fn test_import_album_folder() {
    let t = TestEngine::new();

    let outcome = t
        .engine
        .import_album_folder(42, "/downloads/OK Computer", ImportMode::Move)
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.message, "No files to import");

    t.source.with(|s| {
        s.import_candidates = vec![ImportCandidate {
            path: Some("/downloads/OK Computer/CD1/01 - Airbag.flac".to_string()),
            ..Default::default()
        }]
    });
    let outcome = t
        .engine
        .import_album_folder(42, "/downloads/OK Computer", ImportMode::Copy)
        .await;

    assert!(outcome.success);
    let imports = t.source.with(|s| s.imports.clone());
    assert_eq!(
        imports,
        vec![(42, "/downloads/OK Computer/CD1".to_string(), ImportMode::Copy)]
    );
}

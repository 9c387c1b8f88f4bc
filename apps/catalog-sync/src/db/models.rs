use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub lidarr_id: Option<i64>,
    pub foreign_id: Option<String>,
    pub name: String,
    pub biography: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Artist fields as copied from the catalog source, before a local ID exists.
#[derive(Debug, Clone, Default)]
pub struct NewArtist {
    pub lidarr_id: i64,
    pub foreign_id: Option<String>,
    pub name: String,
    pub biography: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub lidarr_album_id: Option<i64>,
    pub artist_id: i64,
    pub title: String,
    pub album_type: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub cover_image_url: Option<String>,
    pub foreign_album_id: Option<String>,
    pub legacy_album_id: Option<i64>,
    /// Release tracked by the catalog source; scopes track queries
    pub monitored_release_id: Option<i64>,
    pub downloaded: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewAlbum {
    pub lidarr_album_id: i64,
    pub artist_id: i64,
    pub title: String,
    pub album_type: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub cover_image_url: Option<String>,
    pub foreign_album_id: Option<String>,
    pub legacy_album_id: Option<i64>,
    pub monitored_release_id: Option<i64>,
    pub downloaded: bool,
}

/// An album joined with its owning artist, as needed by the track stage.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumWithArtist {
    pub album: Album,
    pub artist: Artist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub lidarr_track_id: Option<i64>,
    pub album_id: i64,
    pub title: String,
    pub duration_secs: i64,
    pub track_number: i32,
    pub disc_number: i32,
    pub explicit: bool,
    pub audio_path: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewTrack {
    pub lidarr_track_id: i64,
    pub album_id: i64,
    pub title: String,
    pub duration_secs: i64,
    pub track_number: i32,
    pub disc_number: i32,
    pub explicit: bool,
    pub audio_path: Option<String>,
}

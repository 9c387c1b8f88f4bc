//! Local catalog store.
//!
//! Natural-key lookups and idempotent inserts for artists, albums, tracks and
//! genres. Every insert is keyed on the external catalog ID (or the genre name)
//! with `ON CONFLICT DO NOTHING` followed by a read-back, so a repeated or
//! racing insert returns the row that is already there instead of a duplicate.

use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{
    Album, AlbumWithArtist, Artist, Genre, NewAlbum, NewArtist, NewTrack, Track,
};
use crate::error::{AppError, Result};

const ARTIST_COLUMNS: &str =
    "id, lidarr_id, foreign_id, name, biography, image_url, created_at, updated_at";

const ALBUM_COLUMNS: &str = "id, lidarr_album_id, artist_id, title, album_type, release_date, \
     cover_image_url, foreign_album_id, legacy_album_id, monitored_release_id, downloaded, \
     created_at, updated_at";

const TRACK_COLUMNS: &str = "id, lidarr_track_id, album_id, title, duration_secs, track_number, \
     disc_number, explicit, audio_path, created_at";

const GENRE_COLUMNS: &str = "id, name, description, image_url";

/// Row counts of the local mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: u64,
    pub albums: u64,
    pub tracks: u64,
    pub genres: u64,
}

/// SQLite-backed store for the local catalog mirror.
#[derive(Clone)]
pub struct CatalogStore {
    db: Arc<Mutex<Connection>>,
}

impl CatalogStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    // =========================================================================
    // Artists
    // =========================================================================

    pub async fn list_artists(&self) -> Result<Vec<Artist>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM artists ORDER BY id",
            ARTIST_COLUMNS
        ))?;
        let artists = stmt
            .query_map([], map_artist_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }

    pub async fn find_artist_by_lidarr_id(&self, lidarr_id: i64) -> Result<Option<Artist>> {
        let db = self.db.lock().await;
        let artist = db
            .query_row(
                &format!("SELECT {} FROM artists WHERE lidarr_id = ?1", ARTIST_COLUMNS),
                [lidarr_id],
                map_artist_row,
            )
            .optional()?;
        Ok(artist)
    }

    pub async fn find_artist_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Artist>> {
        let db = self.db.lock().await;
        let artist = db
            .query_row(
                &format!(
                    "SELECT {} FROM artists WHERE foreign_id = ?1 ORDER BY id LIMIT 1",
                    ARTIST_COLUMNS
                ),
                [foreign_id],
                map_artist_row,
            )
            .optional()?;
        Ok(artist)
    }

    /// Insert an artist keyed by its external ID.
    ///
    /// Returns the stored row and whether this call created it.
    pub async fn insert_artist(&self, artist: &NewArtist) -> Result<(Artist, bool)> {
        let db = self.db.lock().await;
        let inserted = db.execute(
            r#"
            INSERT INTO artists (lidarr_id, foreign_id, name, biography, image_url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT DO NOTHING
            "#,
            params![
                artist.lidarr_id,
                artist.foreign_id,
                artist.name,
                artist.biography,
                artist.image_url,
            ],
        )?;

        let stored = db.query_row(
            &format!("SELECT {} FROM artists WHERE lidarr_id = ?1", ARTIST_COLUMNS),
            [artist.lidarr_id],
            map_artist_row,
        )?;

        Ok((stored, inserted > 0))
    }

    pub async fn attach_artist_genre(&self, artist_id: i64, genre_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO artist_genres (artist_id, genre_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            [artist_id, genre_id],
        )?;
        Ok(())
    }

    pub async fn artist_genres(&self, artist_id: i64) -> Result<Vec<Genre>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            r#"
            SELECT g.id, g.name, g.description, g.image_url
            FROM genres g
            JOIN artist_genres ag ON ag.genre_id = g.id
            WHERE ag.artist_id = ?1
            ORDER BY g.name
            "#,
        )?;
        let genres = stmt
            .query_map([artist_id], map_genre_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(genres)
    }

    // =========================================================================
    // Albums
    // =========================================================================

    pub async fn find_album_by_lidarr_id(&self, lidarr_album_id: i64) -> Result<Option<Album>> {
        let db = self.db.lock().await;
        let album = db
            .query_row(
                &format!(
                    "SELECT {} FROM albums WHERE lidarr_album_id = ?1",
                    ALBUM_COLUMNS
                ),
                [lidarr_album_id],
                map_album_row,
            )
            .optional()?;
        Ok(album)
    }

    /// Insert an album keyed by its external album ID.
    ///
    /// Returns the stored row and whether this call created it.
    pub async fn insert_album(&self, album: &NewAlbum) -> Result<(Album, bool)> {
        let db = self.db.lock().await;
        let inserted = db.execute(
            r#"
            INSERT INTO albums (
                lidarr_album_id, artist_id, title, album_type, release_date,
                cover_image_url, foreign_album_id, legacy_album_id,
                monitored_release_id, downloaded
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT DO NOTHING
            "#,
            params![
                album.lidarr_album_id,
                album.artist_id,
                album.title,
                album.album_type,
                album.release_date,
                album.cover_image_url,
                album.foreign_album_id,
                album.legacy_album_id,
                album.monitored_release_id,
                album.downloaded,
            ],
        )?;

        let stored = db.query_row(
            &format!(
                "SELECT {} FROM albums WHERE lidarr_album_id = ?1",
                ALBUM_COLUMNS
            ),
            [album.lidarr_album_id],
            map_album_row,
        )?;

        Ok((stored, inserted > 0))
    }

    pub async fn set_album_downloaded(&self, album_id: i64, downloaded: bool) -> Result<()> {
        let db = self.db.lock().await;
        let updated = db.execute(
            "UPDATE albums SET downloaded = ?1, updated_at = datetime('now') WHERE id = ?2",
            params![downloaded, album_id],
        )?;
        if updated == 0 {
            return Err(AppError::NotFound(format!("Album {} not found", album_id)));
        }
        Ok(())
    }

    pub async fn attach_album_genre(&self, album_id: i64, genre_id: i64) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO album_genres (album_id, genre_id) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            [album_id, genre_id],
        )?;
        Ok(())
    }

    pub async fn album_genres(&self, album_id: i64) -> Result<Vec<Genre>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            r#"
            SELECT g.id, g.name, g.description, g.image_url
            FROM genres g
            JOIN album_genres ag ON ag.genre_id = g.id
            WHERE ag.album_id = ?1
            ORDER BY g.name
            "#,
        )?;
        let genres = stmt
            .query_map([album_id], map_genre_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(genres)
    }

    /// All albums joined with their owning artist.
    pub async fn list_albums_with_artist(&self) -> Result<Vec<AlbumWithArtist>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            r#"
            SELECT al.id, al.lidarr_album_id, al.artist_id, al.title, al.album_type,
                   al.release_date, al.cover_image_url, al.foreign_album_id,
                   al.legacy_album_id, al.monitored_release_id, al.downloaded,
                   al.created_at, al.updated_at,
                   ar.id, ar.lidarr_id, ar.foreign_id, ar.name, ar.biography,
                   ar.image_url, ar.created_at, ar.updated_at
            FROM albums al
            JOIN artists ar ON al.artist_id = ar.id
            ORDER BY al.id
            "#,
        )?;
        let albums = stmt
            .query_map([], |row| {
                Ok(AlbumWithArtist {
                    album: map_album_row(row)?,
                    artist: Artist {
                        id: row.get(13)?,
                        lidarr_id: row.get(14)?,
                        foreign_id: row.get(15)?,
                        name: row.get(16)?,
                        biography: row.get(17)?,
                        image_url: row.get(18)?,
                        created_at: row.get(19)?,
                        updated_at: row.get(20)?,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    pub async fn find_track_by_lidarr_id(&self, lidarr_track_id: i64) -> Result<Option<Track>> {
        let db = self.db.lock().await;
        let track = db
            .query_row(
                &format!(
                    "SELECT {} FROM tracks WHERE lidarr_track_id = ?1",
                    TRACK_COLUMNS
                ),
                [lidarr_track_id],
                map_track_row,
            )
            .optional()?;
        Ok(track)
    }

    /// Insert a track keyed by its external track ID.
    ///
    /// Returns the stored row and whether this call created it.
    pub async fn insert_track(&self, track: &NewTrack) -> Result<(Track, bool)> {
        let db = self.db.lock().await;
        let inserted = db.execute(
            r#"
            INSERT INTO tracks (
                lidarr_track_id, album_id, title, duration_secs, track_number,
                disc_number, explicit, audio_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT DO NOTHING
            "#,
            params![
                track.lidarr_track_id,
                track.album_id,
                track.title,
                track.duration_secs,
                track.track_number,
                track.disc_number,
                track.explicit,
                track.audio_path,
            ],
        )?;

        let stored = db.query_row(
            &format!(
                "SELECT {} FROM tracks WHERE lidarr_track_id = ?1",
                TRACK_COLUMNS
            ),
            [track.lidarr_track_id],
            map_track_row,
        )?;

        Ok((stored, inserted > 0))
    }

    pub async fn tracks_for_album(&self, album_id: i64) -> Result<Vec<Track>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {} FROM tracks WHERE album_id = ?1 ORDER BY disc_number, track_number, id",
            TRACK_COLUMNS
        ))?;
        let tracks = stmt
            .query_map([album_id], map_track_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    // =========================================================================
    // Genres
    // =========================================================================

    /// Case-insensitive exact lookup.
    pub async fn find_genre_by_name(&self, name: &str) -> Result<Option<Genre>> {
        let db = self.db.lock().await;
        let genre = db
            .query_row(
                &format!("SELECT {} FROM genres WHERE name_key = ?1", GENRE_COLUMNS),
                [genre_key(name)],
                map_genre_row,
            )
            .optional()?;
        Ok(genre)
    }

    /// Insert a genre unless one with the same name (ignoring case) exists.
    ///
    /// The first inserted casing is kept; the stored row is returned either way.
    pub async fn insert_genre(&self, name: &str) -> Result<Genre> {
        let key = genre_key(name);
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO genres (name, name_key) VALUES (?1, ?2) ON CONFLICT DO NOTHING",
            [name, key.as_str()],
        )?;
        let genre = db.query_row(
            &format!("SELECT {} FROM genres WHERE name_key = ?1", GENRE_COLUMNS),
            [key],
            map_genre_row,
        )?;
        Ok(genre)
    }

    pub async fn counts(&self) -> Result<CatalogCounts> {
        let db = self.db.lock().await;
        let count = |table: &str| -> rusqlite::Result<u64> {
            db.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
        };
        Ok(CatalogCounts {
            artists: count("artists")?,
            albums: count("albums")?,
            tracks: count("tracks")?,
            genres: count("genres")?,
        })
    }
}

/// Maps a database row to an Artist struct.
fn map_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(0)?,
        lidarr_id: row.get(1)?,
        foreign_id: row.get(2)?,
        name: row.get(3)?,
        biography: row.get(4)?,
        image_url: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Maps a database row to an Album struct.
fn map_album_row(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        lidarr_album_id: row.get(1)?,
        artist_id: row.get(2)?,
        title: row.get(3)?,
        album_type: row.get(4)?,
        release_date: row.get(5)?,
        cover_image_url: row.get(6)?,
        foreign_album_id: row.get(7)?,
        legacy_album_id: row.get(8)?,
        monitored_release_id: row.get(9)?,
        downloaded: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Maps a database row to a Track struct.
fn map_track_row(row: &rusqlite::Row) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        lidarr_track_id: row.get(1)?,
        album_id: row.get(2)?,
        title: row.get(3)?,
        duration_secs: row.get(4)?,
        track_number: row.get(5)?,
        disc_number: row.get(6)?,
        explicit: row.get(7)?,
        audio_path: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Unique key for a genre name. Unicode-aware, unlike SQLite's NOCASE.
fn genre_key(name: &str) -> String {
    name.to_lowercase()
}

fn map_genre_row(row: &rusqlite::Row) -> rusqlite::Result<Genre> {
    Ok(Genre {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        image_url: row.get(3)?,
    })
}

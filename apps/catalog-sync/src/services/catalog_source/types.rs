//! Records exchanged with the catalog source (Lidarr API v1).
//!
//! Every field the source may omit or send as `null` is optional here; the
//! reconcilers decide which gaps they can default and which fail a record.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept both a missing field and an explicit `null` as an empty list.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Artist Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistRecord {
    /// External catalog ID
    pub id: Option<i64>,
    pub artist_name: Option<String>,
    /// Cross-service identifier (MusicBrainz artist ID)
    pub foreign_artist_id: Option<String>,
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub images: Vec<ImageRecord>,
    pub path: Option<String>,
    pub monitored: Option<bool>,
}

impl ArtistRecord {
    /// Remote URL of the first image, if any.
    pub fn first_image_url(&self) -> Option<String> {
        self.images.first().and_then(|img| img.remote_url.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub url: Option<String>,
    /// e.g. "cover", "poster", "fanart"
    pub cover_type: Option<String>,
    pub extension: Option<String>,
    pub remote_url: Option<String>,
}

/// Options sent with a new artist so the source adds it without grabbing anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptions {
    pub monitor: String,
    pub search_for_missing_albums: bool,
    pub monitored: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            monitor: "none".to_string(),
            search_for_missing_albums: false,
            monitored: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddArtistRequest {
    pub artist_name: String,
    pub foreign_artist_id: String,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
    pub root_folder_path: String,
    pub add_options: AddOptions,
}

// =============================================================================
// Album Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRecord {
    /// External catalog album ID
    pub id: Option<i64>,
    pub title: Option<String>,
    pub artist_id: Option<i64>,
    pub foreign_album_id: Option<String>,
    pub monitored: Option<bool>,
    /// e.g. "Album", "EP", "Single"
    pub album_type: Option<String>,
    /// `YYYY-MM-DD` or an ISO-8601 date-time
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub releases: Vec<ReleaseRecord>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub images: Vec<ImageRecord>,
    pub statistics: Option<AlbumStatistics>,
}

impl AlbumRecord {
    /// Parsed release date; anything unparsable yields `None`.
    pub fn parsed_release_date(&self) -> Option<NaiveDate> {
        self.release_date.as_deref().and_then(parse_release_date)
    }

    /// Prefer an image typed as cover, else the first image.
    pub fn cover_art(&self) -> Option<String> {
        self.images
            .iter()
            .find(|img| img.cover_type.as_deref() == Some("cover") && img.remote_url.is_some())
            .or_else(|| self.images.first())
            .and_then(|img| img.remote_url.clone())
    }

    /// ID of the first release flagged monitored.
    pub fn monitored_release_id(&self) -> Option<i64> {
        self.releases
            .iter()
            .find(|release| release.monitored.unwrap_or(false))
            .and_then(|release| release.id)
    }

    /// Album identifier exposed by the first release, when present.
    pub fn legacy_album_id(&self) -> Option<i64> {
        self.releases.first().and_then(|release| release.album_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: Option<i64>,
    pub album_id: Option<i64>,
    pub foreign_release_id: Option<String>,
    pub title: Option<String>,
    pub track_count: Option<i64>,
    pub monitored: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumStatistics {
    pub track_file_count: Option<i64>,
    pub track_count: Option<i64>,
    pub total_track_count: Option<i64>,
    pub size_on_disk: Option<i64>,
    pub percent_of_tracks: Option<f64>,
}

impl AlbumStatistics {
    /// Every track of the monitored release has a file.
    pub fn is_complete(&self) -> bool {
        matches!(
            (self.track_file_count, self.track_count),
            (Some(files), Some(tracks)) if files == tracks
        )
    }

    /// At least one track file is present; `None` when either count is missing.
    pub fn has_files(&self) -> Option<bool> {
        match (self.track_file_count, self.track_count) {
            (Some(files), Some(_)) => Some(files > 0),
            _ => None,
        }
    }
}

// =============================================================================
// Track Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    /// External catalog track ID
    pub id: Option<i64>,
    pub title: Option<String>,
    /// Duration as reported by the source, stored as seconds
    pub duration: Option<i64>,
    pub track_number: Option<String>,
    pub absolute_track_number: Option<i32>,
    pub medium_number: Option<i32>,
    pub explicit: Option<bool>,
    pub has_file: Option<bool>,
    pub track_file_id: Option<i64>,
    pub artist_id: Option<i64>,
    pub album_id: Option<i64>,
}

// =============================================================================
// Download Queue / Import Types
// =============================================================================

/// Download state of an album in the source's queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub status: String,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<String>,
}

impl QueueStatus {
    pub fn not_in_queue() -> Self {
        Self {
            status: "not_in_queue".to_string(),
            progress: 0.0,
            error_message: None,
            estimated_completion_time: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            progress: 0.0,
            error_message: Some(message.into()),
            estimated_completion_time: None,
        }
    }

    /// Build a status from a `/queue/details` response (a JSON array).
    ///
    /// Only the first queue entry is considered.
    pub fn from_queue_details(details: &Value) -> Self {
        let Some(item) = details
            .as_array()
            .and_then(|items| items.iter().find(|item| item.is_object()))
        else {
            return Self::not_in_queue();
        };

        let status = match item.get("status") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        };

        let progress = match (
            item.get("size").and_then(Value::as_f64),
            item.get("sizeleft").and_then(Value::as_f64),
        ) {
            (Some(size), Some(left)) if size > 0.0 => 100.0 * (size - left) / size,
            _ => 0.0,
        };

        let titles: Vec<&str> = item
            .get("statusMessages")
            .and_then(Value::as_array)
            .map(|messages| {
                messages
                    .iter()
                    .filter_map(|msg| msg.get("title").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default();
        let error_message = (!titles.is_empty()).then(|| titles.join("; "));

        let estimated_completion_time = item
            .get("estimatedCompletionTime")
            .filter(|v| !v.is_null())
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));

        Self {
            status,
            progress,
            error_message,
            estimated_completion_time,
        }
    }
}

/// A file the source offers for manual import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCandidate {
    pub path: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub size: i64,
    pub album_id: Option<i64>,
    pub album_release_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    Auto,
    #[default]
    Move,
    Copy,
}

/// Result of asking the source to import a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub message: String,
}

/// Parse `YYYY-MM-DD`, or the date prefix of an ISO-8601 date-time.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = if raw.contains('T') {
        raw.get(..10)?
    } else {
        raw
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

//! Lidarr v1 REST client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use super::types::{
    AddArtistRequest, AlbumRecord, ArtistRecord, ImportCandidate, ImportMode, QueueStatus,
    TrackRecord,
};
use super::CatalogSource;
use crate::config::CatalogSourceConfig;
use crate::error::{AppError, Result};

const API_KEY_HEADER: &str = "X-Api-Key";

/// HTTP client for a Lidarr instance.
pub struct LidarrClient {
    client: Client,
    base_url: String,
}

impl LidarrClient {
    /// Create a new client from the catalog source configuration.
    ///
    /// The API key is sent on every request; a missing key is allowed so the
    /// service can start, but the source will reject the calls.
    pub fn new(config: &CatalogSourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = config.api_key.as_deref() {
            let mut value = HeaderValue::from_str(key)
                .map_err(|e| AppError::BadRequest(format!("Invalid catalog source API key: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .user_agent(concat!("catalog-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new client wrapped in Arc for shared access.
    pub fn new_shared(config: &CatalogSourceConfig) -> Result<Arc<Self>> {
        Ok(Arc::new(Self::new(config)?))
    }

    // =========================================================================
    // Request Helpers
    // =========================================================================

    async fn get_json<T, P>(&self, path: &str, params: &[P]) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("Request to {} failed: {}", path, e)))?;

        let response = check_status(path, response)?;
        response
            .json::<T>()
            .await
            .map_err(|e| AppError::Source(format!("Failed to parse response from {}: {}", path, e)))
    }

    async fn send_json<B>(&self, method: Method, path: &str, body: &B) -> Result<Value>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .request(method.clone(), &url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Source(format!("{} {} failed: {}", method, path, e)))?;

        let response = check_status(path, response)?;
        // Command endpoints may answer with an empty body
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Source(format!("Failed to read response from {}: {}", path, e)))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| AppError::Source(format!("Failed to parse response from {}: {}", path, e)))
    }

    async fn post_command(&self, body: Value) -> Result<Value> {
        self.send_json(Method::POST, "/command", &body).await
    }
}

fn check_status(path: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!(
            "Catalog source resource not found: {}",
            path
        )));
    }

    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Source(format!(
            "Catalog source rejected the API key for {}",
            path
        )));
    }

    if !status.is_success() {
        return Err(AppError::Source(format!(
            "Catalog source {} returned error status: {}",
            path, status
        )));
    }

    Ok(response)
}

#[async_trait]
impl CatalogSource for LidarrClient {
    async fn list_artists(&self) -> Result<Vec<ArtistRecord>> {
        tracing::debug!("Fetching artists from catalog source");
        self.get_json::<Vec<ArtistRecord>, (&str, String)>("/artist", &[])
            .await
    }

    async fn get_artist(&self, artist_id: i64) -> Result<Option<ArtistRecord>> {
        tracing::debug!(artist_id, "Fetching artist from catalog source");
        match self
            .get_json::<ArtistRecord, (&str, String)>(&format!("/artist/{}", artist_id), &[])
            .await
        {
            Ok(artist) => Ok(Some(artist)),
            Err(AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_artists_by_foreign_id(&self, foreign_id: &str) -> Result<Vec<ArtistRecord>> {
        tracing::debug!(foreign_id = %foreign_id, "Looking up artist by foreign ID");
        self.get_json("/artist", &[("mbId", foreign_id)]).await
    }

    async fn add_artist(&self, request: &AddArtistRequest) -> Result<ArtistRecord> {
        tracing::info!(
            artist = %request.artist_name,
            foreign_id = %request.foreign_artist_id,
            "Adding artist to catalog source"
        );
        let value = self.send_json(Method::POST, "/artist", request).await?;
        serde_json::from_value(value)
            .map_err(|e| AppError::Source(format!("Failed to parse added artist: {}", e)))
    }

    async fn list_albums(&self, artist_id: i64) -> Result<Vec<AlbumRecord>> {
        tracing::debug!(artist_id, "Fetching albums from catalog source");
        self.get_json("/album", &[("artistId", artist_id)]).await
    }

    async fn list_tracks(
        &self,
        artist_id: i64,
        album_id: i64,
        release_id: Option<i64>,
    ) -> Result<Vec<TrackRecord>> {
        tracing::debug!(artist_id, album_id, release_id = ?release_id, "Fetching tracks from catalog source");
        let mut params = vec![("artistId", artist_id), ("albumId", album_id)];
        if let Some(release_id) = release_id {
            params.push(("albumReleaseId", release_id));
        }
        self.get_json("/track", &params).await
    }

    async fn set_album_monitored(&self, album_id: i64, monitored: bool) -> Result<bool> {
        let path = format!("/album/{}", album_id);
        let mut album: Value = self.get_json::<Value, (&str, String)>(&path, &[]).await?;

        let Some(fields) = album.as_object_mut() else {
            return Err(AppError::Source(format!(
                "Unexpected album payload for {}",
                album_id
            )));
        };
        fields.insert("monitored".to_string(), Value::Bool(monitored));
        // The embedded artist is read-only on PUT
        fields.remove("artist");

        self.send_json(Method::PUT, &path, &album).await?;
        tracing::info!(album_id, monitored, "Updated album monitoring");
        Ok(true)
    }

    async fn trigger_album_search(&self, album_id: i64) -> Result<bool> {
        self.post_command(json!({ "name": "AlbumSearch", "albumIds": [album_id] }))
            .await?;
        tracing::info!(album_id, "Triggered album search");
        Ok(true)
    }

    async fn album_queue_status(&self, album_id: i64) -> Result<QueueStatus> {
        let details: Value = self
            .get_json(
                "/queue/details",
                &[
                    ("albumIds", album_id.to_string()),
                    ("includeArtist", "false".to_string()),
                    ("includeAlbum", "true".to_string()),
                ],
            )
            .await?;
        Ok(QueueStatus::from_queue_details(&details))
    }

    async fn manual_import_candidates(
        &self,
        folder: &str,
        filter_existing_files: bool,
        replace_existing_files: bool,
    ) -> Result<Vec<ImportCandidate>> {
        tracing::debug!(folder = %folder, "Listing manual import candidates");
        self.get_json(
            "/manualimport",
            &[
                ("folder", folder.to_string()),
                ("filterExistingFiles", filter_existing_files.to_string()),
                ("replaceExisting", replace_existing_files.to_string()),
            ],
        )
        .await
    }

    async fn import_album(&self, album_id: i64, folder: &str, mode: ImportMode) -> Result<bool> {
        self.post_command(json!({
            "name": "ImportAlbum",
            "albumId": album_id,
            "path": folder,
            "importMode": mode,
            "folderImport": true,
        }))
        .await?;
        tracing::info!(album_id, folder = %folder, "Triggered album import");
        Ok(true)
    }
}

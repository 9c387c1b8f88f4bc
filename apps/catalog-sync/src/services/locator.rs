//! Locates the audio file for a track inside the local media library.
//!
//! Files are laid out as `<root>/<Artist+Name>/<Album>/<NN> - <Title>.<ext>`.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};

lazy_static! {
    /// Runs of whitespace in artist directory names are stored as `+`.
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Extensions probed in order of preference.
const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "wav", "m4a", "ogg"];

const DEFAULT_EXTENSION: &str = "flac";

/// Resolves track audio paths under a media root.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
}

impl FileLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Find the audio file for a track. Never fails: when nothing matches on
    /// disk the expected `.flac` path is returned.
    pub async fn locate(
        &self,
        artist_name: &str,
        album_title: &str,
        track_title: &str,
        track_number: i32,
    ) -> String {
        let album_dir = self
            .root
            .join(path_component(&artist_dir_name(artist_name)))
            .join(path_component(album_title));
        let prefix = format!("{:02} - ", track_number);
        let stem = format!("{}{}", prefix, track_title);

        for ext in AUDIO_EXTENSIONS {
            let candidate = album_dir.join(format!("{}.{}", stem, ext));
            if tokio::fs::metadata(&candidate).await.is_ok() {
                return candidate.to_string_lossy().into_owned();
            }
        }

        if let Some(found) = scan_album_dir(&album_dir, &prefix).await {
            return found.to_string_lossy().into_owned();
        }

        let guess = album_dir.join(format!("{}.{}", stem, DEFAULT_EXTENSION));
        tracing::warn!(
            path = %guess.display(),
            "No audio file found for track, using expected path"
        );
        guess.to_string_lossy().into_owned()
    }
}

/// Directory name used for an artist under the media root.
pub fn artist_dir_name(artist_name: &str) -> String {
    WHITESPACE_RUN.replace_all(artist_name, "+").into_owned()
}

/// Strip leading separators so `join` cannot replace the media root.
fn path_component(name: &str) -> &str {
    name.trim_start_matches(['/', '\\'])
}

/// First `.flac` entry whose name starts with the track prefix, ignoring case.
async fn scan_album_dir(album_dir: &Path, prefix: &str) -> Option<PathBuf> {
    let mut entries = match tokio::fs::read_dir(album_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(dir = %album_dir.display(), error = %e, "Album directory not readable");
            return None;
        }
    };

    let prefix = prefix.to_lowercase();
    let suffix = format!(".{}", DEFAULT_EXTENSION);

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let lowered = name.to_string_lossy().to_lowercase();
        if lowered.starts_with(&prefix) && lowered.ends_with(&suffix) {
            return Some(entry.path());
        }
    }

    None
}

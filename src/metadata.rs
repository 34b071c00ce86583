//! Sidecar metadata extraction.
//!
//! The downloader writes a `<name>.info.json` file next to every media file.
//! It carries far more than we need (formats, thumbnails, chapters, ...);
//! [`extract`] keeps only the fields that end up in the feed or drive
//! retention, and fills in defaults for anything missing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Stand-in upload date for sidecars that do not carry one.
pub const SENTINEL_UPLOAD_DATE: &str = "20160101";

const SIDECAR_EXTENSION: &str = "info.json";

/// One downloaded episode, as persisted in the download state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Stable id, used for de-duplication.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub full_title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub playlist_title: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub uploader_url: Option<String>,
    /// Direct media URL at download time; usually expires.
    #[serde(default)]
    pub url: Option<String>,
    /// `YYYYMMDD`.
    pub upload_date: String,
    /// Bytes.
    #[serde(default)]
    pub filesize: u64,
    pub media_path: PathBuf,
    pub metadata_path: PathBuf,
    pub channel: String,
}

impl MediaItem {
    /// File name of the media file, as published in the enclosure URL.
    pub fn media_file_name(&self) -> String {
        self.media_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// The subset of the downloader's sidecar we read. Everything is optional.
#[derive(Debug, Default, Deserialize)]
struct Sidecar {
    id: Option<String>,
    title: Option<String>,
    full_title: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    playlist_title: Option<String>,
    webpage_url: Option<String>,
    uploader_url: Option<String>,
    url: Option<String>,
    upload_date: Option<String>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

/// `video.mp4` -> `video.info.json`.
pub fn sidecar_path_for(media_path: &Path) -> PathBuf {
    media_path.with_extension(SIDECAR_EXTENSION)
}

/// Read the sidecar that belongs to `media_path` and build a [`MediaItem`].
///
/// Errors with [`Error::MetadataUnreadable`] or [`Error::MalformedMetadata`];
/// callers skip the item either way.
pub fn extract(media_path: &Path, channel: &str) -> Result<MediaItem> {
    let metadata_path = sidecar_path_for(media_path);
    let raw = fs::read(&metadata_path).map_err(|source| Error::MetadataUnreadable {
        path: metadata_path.clone(),
        source,
    })?;
    let sidecar: Sidecar =
        serde_json::from_slice(&raw).map_err(|source| Error::MalformedMetadata {
            path: metadata_path.clone(),
            source,
        })?;

    Ok(normalize(sidecar, media_path, metadata_path, channel))
}

fn normalize(sidecar: Sidecar, media_path: &Path, metadata_path: PathBuf, channel: &str) -> MediaItem {
    let stem = media_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let filesize = sidecar
        .filesize
        .or_else(|| sidecar.filesize_approx.map(|approx| approx.max(0.0) as u64))
        .unwrap_or(0);

    MediaItem {
        id: non_empty(sidecar.id).unwrap_or_else(|| stem.clone()),
        title: non_empty(sidecar.title)
            .or_else(|| non_empty(sidecar.full_title.clone()))
            .unwrap_or(stem),
        full_title: sidecar.full_title,
        description: sidecar.description,
        thumbnail: sidecar.thumbnail,
        playlist_title: sidecar.playlist_title,
        webpage_url: sidecar.webpage_url,
        uploader_url: sidecar.uploader_url,
        url: sidecar.url,
        upload_date: non_empty(sidecar.upload_date)
            .unwrap_or_else(|| SENTINEL_UPLOAD_DATE.to_string()),
        filesize,
        // The sidecar's `_filename` can predate a container merge; the path
        // the downloader reported is authoritative.
        media_path: media_path.to_path_buf(),
        metadata_path,
        channel: channel.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

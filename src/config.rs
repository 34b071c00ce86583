//! Channel configuration.
//!
//! One JSON file describes one channel: where to download from, which date
//! range to consider, how many episodes to keep on disk, and the metadata of
//! the published feed.
//!
//! ```json
//! {
//!   "channel": "@caseyneistat",
//!   "verbose_output": false,
//!   "download": { "from": "today-1week", "to": "today", "keep_latest": 4 },
//!   "rss": {
//!     "title": "Casey Neistat",
//!     "author": "Casey",
//!     "description": "Vlogs",
//!     "image": "https://example.com/cover.png",
//!     "feed_base_url": "https://example.com/podcasts/",
//!     "feed_output_file_name": "feed-casey.rss",
//!     "link": "https://www.youtube.com/@caseyneistat"
//!   }
//! }
//! ```
//!
//! The `download` block and `verbose_output` may be omitted entirely.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Immutable description of one channel, loaded once per run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Channel identifier: a handle (`@name`), a user name, or a full URL.
    pub channel: String,
    #[serde(default)]
    pub verbose_output: bool,
    #[serde(default)]
    pub download: DownloadOptions,
    pub rss: RssOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DownloadOptions {
    /// Start of the upload-date window, absolute (`20240101`) or relative
    /// (`today-1week`). Passed through to the downloader untouched.
    #[serde(default = "default_from", alias = "range_from", alias = "begin")]
    pub from: String,
    #[serde(default = "default_to", alias = "range_to", alias = "end")]
    pub to: String,
    /// How many of the most recent episodes keep their files on disk.
    #[serde(default = "default_keep_latest")]
    pub keep_latest: usize,
    /// Optional downloader format selector (e.g. `"22"` for 720p mp4).
    #[serde(default)]
    pub format: Option<String>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: default_to(),
            keep_latest: default_keep_latest(),
            format: None,
        }
    }
}

fn default_from() -> String {
    "today-1week".into()
}

fn default_to() -> String {
    "today".into()
}

fn default_keep_latest() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RssOptions {
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: String,
    /// Prefix for enclosure URLs; the escaped media filename is appended.
    pub feed_base_url: String,
    pub feed_output_file_name: String,
    pub link: String,
}

impl ChannelConfig {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
        Self::from_json(&raw).map_err(|reason| Error::config(path, reason))
    }

    /// Parse and validate configuration text. Errors are plain messages; the
    /// caller attaches the path.
    pub fn from_json(raw: &str) -> std::result::Result<Self, String> {
        let config: ChannelConfig = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let required = [
            ("channel", &self.channel),
            ("rss.feed_output_file_name", &self.rss.feed_output_file_name),
            ("rss.feed_base_url", &self.rss.feed_base_url),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(format!("`{key}` must not be empty"));
            }
        }
        Ok(())
    }

    /// Where the feed is written. Relative names resolve against `workdir`.
    pub fn feed_output_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.rss.feed_output_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"{
        "channel": "test_channel",
        "verbose_output": true,
        "download": { "from": "20240101", "to": "20240201", "keep_latest": 2, "format": "22" },
        "rss": {
            "title": "test_title",
            "author": "test_author",
            "description": "test_description",
            "image": "test_image",
            "feed_base_url": "http://example.com/yt/",
            "feed_output_file_name": "feed.rss",
            "link": "test_link"
        }
    }"#;

    const MINIMAL: &str = r#"{
        "channel": "test_channel",
        "rss": {
            "title": "t", "author": "a", "description": "d", "image": "i",
            "feed_base_url": "http://example.com/", "feed_output_file_name": "feed.rss",
            "link": "l"
        }
    }"#;

    #[test]
    fn parses_every_field() {
        let config = ChannelConfig::from_json(FULL).unwrap();

        assert_eq!(config.channel, "test_channel");
        assert!(config.verbose_output);
        assert_eq!(
            config.download,
            DownloadOptions {
                from: "20240101".into(),
                to: "20240201".into(),
                keep_latest: 2,
                format: Some("22".into()),
            }
        );
        assert_eq!(config.rss.title, "test_title");
        assert_eq!(config.rss.feed_base_url, "http://example.com/yt/");
        assert_eq!(config.rss.feed_output_file_name, "feed.rss");
    }

    #[test]
    fn missing_download_block_uses_defaults() {
        let config = ChannelConfig::from_json(MINIMAL).unwrap();

        assert!(!config.verbose_output);
        assert_eq!(config.download, DownloadOptions::default());
        assert_eq!(config.download.from, "today-1week");
        assert_eq!(config.download.to, "today");
        assert_eq!(config.download.keep_latest, 4);
    }

    #[test]
    fn accepts_legacy_range_keys() {
        let raw = MINIMAL.replace(
            "\"channel\": \"test_channel\",",
            "\"channel\": \"test_channel\", \"download\": { \"range_from\": \"today-7day\", \"end\": \"today\", \"keep_latest\": 0 },",
        );
        let config = ChannelConfig::from_json(&raw).unwrap();

        assert_eq!(config.download.from, "today-7day");
        assert_eq!(config.download.to, "today");
        assert_eq!(config.download.keep_latest, 0);
    }

    #[test]
    fn rejects_negative_keep_latest() {
        let raw = FULL.replace("\"keep_latest\": 2", "\"keep_latest\": -1");
        assert!(ChannelConfig::from_json(&raw).is_err());
    }

    #[test]
    fn rejects_empty_channel() {
        let raw = MINIMAL.replace("\"test_channel\"", "\"  \"");
        let err = ChannelConfig::from_json(&raw).unwrap_err();
        assert!(err.contains("channel"), "got: {err}");
    }

    #[test]
    fn rejects_missing_rss_block() {
        assert!(ChannelConfig::from_json(r#"{ "channel": "x" }"#).is_err());
    }

    #[test]
    fn load_reports_missing_file_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChannelConfig::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn load_reports_bad_json_as_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channel.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ChannelConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn feed_output_path_resolves_against_workdir() {
        let config = ChannelConfig::from_json(MINIMAL).unwrap();
        assert_eq!(
            config.feed_output_path(Path::new("/srv/pod")),
            PathBuf::from("/srv/pod/feed.rss")
        );
    }
}

//! Download state: every episode known for a channel, across runs.
//!
//! The state file is the only thing that survives from one run to the next
//! and is the source of truth for the feed. The downloader's own dedup
//! marker lives beside it, under a name derived from the same channel hash.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fsutil::write_atomic;
use crate::metadata::MediaItem;

/// Hex characters of the channel hash used in file names.
const CHANNEL_HASH_LEN: usize = 16;

/// Items ordered by upload date ascending; ties keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadState {
    items: Vec<MediaItem>,
    /// Fast lookup to avoid inserting duplicates.
    seen: HashSet<String>,
}

impl DownloadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a persisted list. Later duplicates of an id are dropped.
    pub fn from_items(items: Vec<MediaItem>) -> Self {
        let mut state = Self::new();
        for item in items {
            state.insert(item);
        }
        state
    }

    /// Append `item` unless its id is already known. Returns whether it was
    /// admitted.
    pub fn insert(&mut self, item: MediaItem) -> bool {
        if !self.seen.insert(item.id.clone()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Stable sort by upload date. `YYYYMMDD` strings order like the dates
    /// they spell.
    pub fn sort(&mut self) {
        self.items.sort_by(|a, b| a.upload_date.cmp(&b.upload_date));
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// The `n` most recently uploaded items, i.e. the tail.
    pub fn latest(&self, n: usize) -> &[MediaItem] {
        let start = self.items.len().saturating_sub(n);
        &self.items[start..]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Where one channel's state and dedup marker live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStore {
    state_path: PathBuf,
    marker_path: PathBuf,
}

impl StateStore {
    pub fn new(workdir: &Path, channel: &str) -> Self {
        let hash = channel_hash(channel);
        Self {
            state_path: workdir.join(format!("state-{hash}.json")),
            marker_path: workdir.join(format!("archive-{hash}.txt")),
        }
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// The downloader's dedup ledger. Never read or written here.
    pub fn dedup_marker_path(&self) -> &Path {
        &self.marker_path
    }

    /// Load the persisted state. A missing or unreadable file yields an empty
    /// state so that a first run, or a run after corruption, still succeeds.
    pub fn load(&self) -> DownloadState {
        match self.try_load() {
            Ok(state) => {
                debug!(path = %self.state_path.display(), items = state.len(), "loaded download state");
                state
            }
            Err(Error::StateIo { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.state_path.display(), "no download state yet");
                DownloadState::new()
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable download state");
                DownloadState::new()
            }
        }
    }

    fn try_load(&self) -> Result<DownloadState> {
        let raw = fs::read(&self.state_path).map_err(|source| Error::StateIo {
            path: self.state_path.clone(),
            source,
        })?;
        let items: Vec<MediaItem> =
            serde_json::from_slice(&raw).map_err(|source| Error::StateFormat {
                path: self.state_path.clone(),
                source,
            })?;
        Ok(DownloadState::from_items(items))
    }

    /// Persist the full item list, replacing the previous file atomically.
    pub fn save(&self, state: &DownloadState) -> Result<()> {
        let mut bytes =
            serde_json::to_vec_pretty(state.items()).map_err(|source| Error::StateFormat {
                path: self.state_path.clone(),
                source,
            })?;
        bytes.push(b'\n');

        write_atomic(&self.state_path, &bytes).map_err(|source| Error::StateIo {
            path: self.state_path.clone(),
            source,
        })
    }
}

/// Filesystem-safe stand-in for a channel identifier, which may contain `/`,
/// `:` or `@`.
pub fn channel_hash(channel: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(channel.as_bytes());
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(CHANNEL_HASH_LEN);
    hash
}

//! Fetch capability abstraction.
//!
//! This module defines the [`Fetcher`] trait and the events it reports.
//! Concrete fetchers live in sub-modules (currently only [`ytdlp`]).
//!
//! A fetcher downloads every item of a channel inside a date range that is
//! not yet listed in the channel's dedup marker file, writes each media file
//! plus an `.info.json` sidecar into the working directory, and reports one
//! [`FetchEvent`] per item. The marker file belongs to the fetcher; this crate
//! only hands its path through.
//!
//! ## For contributors: adding a new fetcher
//!
//! 1. Create a new file in this directory.
//! 2. Implement [`Fetcher`] for your struct.
//! 3. Re-export it below and construct it in `main.rs`.
//!
//! The reconciliation driver only looks at `Finished` events, so a fetcher is
//! free to report progress states as well.

mod ytdlp;

pub use ytdlp::YtDlp;

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Everything a fetcher needs to know for one run.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub channel: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub format: Option<&'a str>,
    /// The fetcher's own dedup ledger.
    pub marker_path: &'a Path,
    /// Media and sidecar files land here.
    pub workdir: &'a Path,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Finished,
    Downloading,
    Error,
    Other(String),
}

impl FetchStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "finished" => FetchStatus::Finished,
            "downloading" => FetchStatus::Downloading,
            "error" => FetchStatus::Error,
            other => FetchStatus::Other(other.to_string()),
        }
    }
}

/// A raw progress report for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchEvent {
    pub status: FetchStatus,
    /// Path to the media file, as reported by the fetcher.
    pub filename: PathBuf,
}

impl FetchEvent {
    #[cfg(test)]
    pub fn finished(filename: impl Into<PathBuf>) -> Self {
        Self {
            status: FetchStatus::Finished,
            filename: filename.into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == FetchStatus::Finished
    }
}

/// Trait that every fetch capability must implement.
///
/// `fetch` blocks until the download pass is over and returns the complete,
/// finite list of events. No timeout is imposed here; retries and timeouts
/// are the implementation's business.
pub trait Fetcher {
    /// Human-readable label used in log lines.
    fn name(&self) -> &str;

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<FetchEvent>>;
}

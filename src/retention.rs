//! File retention.
//!
//! After a run, the working directory should hold exactly the feed, the
//! state file, the dedup marker and the media + sidecar files of the
//! `keep_latest` most recent episodes. Everything else at the top level of
//! the directory is deleted. Subdirectories are left alone.
//!
//! Older episodes stay in the download state (and therefore in the feed);
//! only their files go away.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::state::DownloadState;

/// File names that survive a sweep. Entries are keyed by file name because
/// the sweep only ever looks at the top level of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepSet {
    names: BTreeSet<OsString>,
}

impl KeepSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `path`; only its file name matters.
    pub fn insert(&mut self, path: &Path) {
        if let Some(name) = path.file_name() {
            self.names.insert(name.to_owned());
        }
    }

    pub fn contains(&self, name: &OsStr) -> bool {
        self.names.contains(name)
    }
}

/// Whether `path` is an entry directly inside `dir`. Both sides are
/// canonicalized, so either may be relative; a parent that cannot be resolved
/// never matches.
pub fn lives_in(dir: &Path, path: &Path) -> bool {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    match (parent.canonicalize(), dir.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Bookkeeping files that are always kept, independent of the episodes.
#[derive(Debug, Clone, Copy)]
pub struct Bookkeeping<'a> {
    /// The feed, when it is written into the swept directory.
    pub feed_path: Option<&'a Path>,
    pub marker_path: &'a Path,
    pub state_path: &'a Path,
    /// The channel configuration, when it lives in the working directory.
    pub config_path: Option<&'a Path>,
}

/// The bookkeeping files plus media and sidecar of the last `keep_latest`
/// items in `state`.
pub fn compute_keep_set(
    bookkeeping: &Bookkeeping<'_>,
    state: &DownloadState,
    keep_latest: usize,
) -> KeepSet {
    let mut keep = KeepSet::new();
    keep.insert(bookkeeping.marker_path);
    keep.insert(bookkeeping.state_path);
    for path in [bookkeeping.feed_path, bookkeeping.config_path].into_iter().flatten() {
        keep.insert(path);
    }

    for item in state.latest(keep_latest) {
        keep.insert(&item.media_path);
        keep.insert(&item.metadata_path);
    }
    keep
}

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct SweepReport {
    pub removed: Vec<PathBuf>,
    /// Deletions that failed for a reason other than the file being gone.
    pub failed: Vec<Error>,
}

/// Delete every regular file directly inside `dir` that is not in `keep`.
///
/// A file that vanished before it could be removed counts as removed. Any
/// other failure, including an unreadable directory entry, is recorded in the
/// report and the sweep carries on. Only a failure to open `dir` itself is
/// returned as an error.
pub fn sweep(dir: &Path, keep: &KeepSet) -> io::Result<SweepReport> {
    let mut report = SweepReport::default();

    // Collect first so the listing is not affected by our own deletions.
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(source) => {
                let err = Error::RetentionIo {
                    path: dir.to_path_buf(),
                    source,
                };
                warn!(error = %err, "could not read directory entry");
                report.failed.push(err);
                continue;
            }
        };
        let name = entry.file_name();
        if keep.contains(&name) {
            continue;
        }
        match entry.file_type() {
            Ok(kind) if kind.is_dir() => {
                debug!(path = %entry.path().display(), "not descending into directory");
            }
            Ok(_) => candidates.push(entry.path()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => report.failed.push(Error::RetentionIo {
                path: entry.path(),
                source,
            }),
        }
    }
    candidates.sort();

    for path in candidates {
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "discarded");
                report.removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "already gone");
                report.removed.push(path);
            }
            Err(source) => {
                let err = Error::RetentionIo { path, source };
                warn!(error = %err, "could not discard file");
                report.failed.push(err);
            }
        }
    }

    Ok(report)
}

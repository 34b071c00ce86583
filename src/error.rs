//! Error taxonomy for a reconciliation run.
//!
//! Every failure a run can hit is one of these variants, and each one maps to
//! a single recovery action:
//!
//! | variant                 | action                                   |
//! |-------------------------|------------------------------------------|
//! | `Config`                | abort before any side effect             |
//! | `MetadataUnreadable`    | skip the item, continue the batch        |
//! | `MalformedMetadata`     | skip the item, continue the batch        |
//! | `InvalidUploadDate`     | omit the item from the feed              |
//! | `StateIo` (load)        | treat as "no prior state"                |
//! | `StateIo` / `StateFormat` (save) | abort the run                   |
//! | `FeedWrite`             | abort the run                            |
//! | `Fetch`                 | no new items this run                    |
//! | `RetentionIo`           | log, keep sweeping                       |

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid channel configuration {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("cannot read metadata sidecar {path}: {source}")]
    MetadataUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed metadata sidecar {path}: {source}")]
    MalformedMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid upload date {date:?} for item {id}")]
    InvalidUploadDate { id: String, date: String },

    #[error("download state I/O on {path}: {source}")]
    StateIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download state {path} is not valid JSON: {source}")]
    StateFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write feed {path}: {reason}")]
    FeedWrite { path: PathBuf, reason: String },

    #[error("fetcher {fetcher} failed: {reason}")]
    Fetch { fetcher: String, reason: String },

    #[error("cannot remove {path}: {source}")]
    RetentionIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Config {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Fatal errors stop the run; everything else is handled per item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. }
                | Error::StateIo { .. }
                | Error::StateFormat { .. }
                | Error::FeedWrite { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! The reconciliation driver.
//!
//! One run walks a fixed sequence of phases:
//!
//! ```text
//! Loading → Fetching → Extracting → Rendering → Persisting → Sweeping → Done
//! ```
//!
//! A bad configuration fails the run before anything is touched. From then
//! on, per-item problems are logged and skipped. Only errors for which
//! [`Error::is_fatal`](crate::error::Error::is_fatal) holds end the run. In
//! practice those come from writing the feed or saving the state, where a
//! lost write would drop episodes.
//!
//! Concurrent runs against the same working directory are not supported.
//! Schedule one run per channel at a time (e.g. cron with `flock`).

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::error::Result;
use crate::feed;
use crate::fetch::{FetchEvent, FetchRequest, Fetcher};
use crate::metadata;
use crate::retention::{self, Bookkeeping};
use crate::state::{DownloadState, StateStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Fetching,
    Extracting,
    Rendering,
    Persisting,
    Sweeping,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Loading => "loading",
            Phase::Fetching => "fetching",
            Phase::Extracting => "extracting",
            Phase::Rendering => "rendering",
            Phase::Persisting => "persisting",
            Phase::Sweeping => "sweeping",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// `Finished` events reported by the fetcher.
    pub fetched: usize,
    /// New items admitted to the state.
    pub added: usize,
    /// Finished items whose sidecar could not be read.
    pub skipped: usize,
    /// Episodes in the written feed.
    pub published: usize,
    /// State items left out of the feed.
    pub omitted: usize,
    /// Files deleted by the sweep.
    pub removed: usize,
}

pub struct Reconciler {
    workdir: PathBuf,
    fetcher: Box<dyn Fetcher>,
    /// Kept during the sweep when it lives in `workdir`.
    config_path: Option<PathBuf>,
}

impl Reconciler {
    pub fn new(workdir: impl Into<PathBuf>, fetcher: Box<dyn Fetcher>) -> Self {
        Self {
            workdir: workdir.into(),
            fetcher,
            config_path: None,
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Load the configuration at `path`, then run. This is the only place a
    /// configuration error can come from.
    pub fn run_from_file(&self, path: &Path) -> Result<RunSummary> {
        debug!(path = %path.display(), "reading channel configuration");
        let config = ChannelConfig::load(path)?;
        self.run(&config)
    }

    pub fn run(&self, config: &ChannelConfig) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        enter(Phase::Loading);
        let store = StateStore::new(&self.workdir, &config.channel);
        let mut state = store.load();
        info!(channel = %config.channel, known = state.len(), "loaded download state");

        enter(Phase::Fetching);
        let events = self.fetch(config, &store)?;

        enter(Phase::Extracting);
        for event in events.iter().filter(|e| e.is_finished()) {
            summary.fetched += 1;
            match self.extract(event, &config.channel, &mut state)? {
                Extracted::Added => summary.added += 1,
                Extracted::Known => {}
                Extracted::Skipped => summary.skipped += 1,
            }
        }
        state.sort();

        enter(Phase::Rendering);
        let document = feed::render(config, &state);
        for err in &document.omitted {
            warn!(error = %err, "omitting item from feed");
        }
        summary.published = document.channel.items().len();
        summary.omitted = document.omitted.len();
        let feed_path = config.feed_output_path(&self.workdir);
        feed::write(&document, &feed_path)?;
        info!(path = %feed_path.display(), episodes = summary.published, "wrote feed");

        enter(Phase::Persisting);
        store.save(&state)?;

        enter(Phase::Sweeping);
        let bookkeeping = Bookkeeping {
            feed_path: self.in_workdir(&feed_path),
            marker_path: store.dedup_marker_path(),
            state_path: store.state_path(),
            config_path: self.config_path.as_deref().and_then(|p| self.in_workdir(p)),
        };
        let keep = retention::compute_keep_set(&bookkeeping, &state, config.download.keep_latest);
        match retention::sweep(&self.workdir, &keep) {
            Ok(report) => {
                summary.removed = report.removed.len();
                if !report.failed.is_empty() {
                    warn!(failed = report.failed.len(), "some files could not be discarded");
                }
            }
            Err(e) => warn!(dir = %self.workdir.display(), error = %e, "skipping sweep"),
        }

        enter(Phase::Done);
        Ok(summary)
    }

    /// `path`, if it sits directly in the working directory. The sweep keeps
    /// files by name, so anything living elsewhere must not shield a
    /// namesake here.
    fn in_workdir<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        retention::lives_in(&self.workdir, path).then_some(path)
    }

    /// A failing fetcher yields no events; the feed is still rebuilt from
    /// what is already known.
    fn fetch(&self, config: &ChannelConfig, store: &StateStore) -> Result<Vec<FetchEvent>> {
        let request = FetchRequest {
            channel: &config.channel,
            from: &config.download.from,
            to: &config.download.to,
            format: config.download.format.as_deref(),
            marker_path: store.dedup_marker_path(),
            workdir: &self.workdir,
            verbose: config.verbose_output,
        };
        match self.fetcher.fetch(&request) {
            Ok(events) => {
                info!(fetcher = self.fetcher.name(), events = events.len(), "fetch complete");
                Ok(events)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "fetch failed, continuing with known items");
                Ok(Vec::new())
            }
        }
    }

    fn extract(
        &self,
        event: &FetchEvent,
        channel: &str,
        state: &mut DownloadState,
    ) -> Result<Extracted> {
        let media_path = self.workdir.join(&event.filename);
        let item = match metadata::extract(&media_path, channel) {
            Ok(item) => item,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "skipping item");
                return Ok(Extracted::Skipped);
            }
        };

        let id = item.id.clone();
        if state.insert(item) {
            info!(id = %id, "added item");
            Ok(Extracted::Added)
        } else {
            debug!(id = %id, "item already known");
            Ok(Extracted::Known)
        }
    }
}

enum Extracted {
    Added,
    Known,
    Skipped,
}

fn enter(phase: Phase) {
    info!(%phase, "entering phase");
}

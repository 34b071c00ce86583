//! yt2rss: turn a video channel into a podcast feed.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ FetchEvent ┌──────────────┐ render() ┌──────────┐
//! │  fetch/   │ ─────────► │ reconcile.rs │ ───────► │ feed.rs  │
//! │ (yt-dlp)  │            │   (driver)   │          │  (rss)   │
//! └───────────┘            └──────────────┘          └──────────┘
//!                           │      ▲     │
//!              extract()    ▼      │     ▼  sweep()
//!                 ┌─────────────┐  │  ┌──────────────┐
//!                 │ metadata.rs │  │  │ retention.rs │
//!                 └─────────────┘  │  └──────────────┘
//!                                  │ load()/save()
//!                            ┌──────────┐
//!                            │ state.rs │
//!                            └──────────┘
//! ```
//!
//! * **`config`**: the per-channel JSON configuration.
//! * **`fetch/`**: the `Fetcher` trait and the `yt-dlp` implementation.
//! * **`metadata`**: turns `.info.json` sidecars into `MediaItem`s.
//! * **`state`**: the persisted list of known episodes.
//! * **`feed`**: renders and writes the RSS document.
//! * **`retention`**: deletes everything but the latest episodes' files.
//! * **`reconcile`**: runs the phases above in order.
//! * **`main`**: parses arguments, sets up logging, maps errors to exit
//!   codes.
//!
//! One invocation handles one channel and is meant to be run periodically,
//! e.g. from cron. Runs against the same directory must not overlap.

mod config;
mod error;
mod feed;
mod fetch;
mod fsutil;
mod metadata;
mod reconcile;
mod retention;
mod state;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fetch::YtDlp;
use reconcile::Reconciler;

/// Exit status when the channel configuration cannot be read or parsed.
const EXIT_CONFIG: u8 = 2;
/// Exit status for any other fatal error.
const EXIT_FAILURE: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "yt2rss", version)]
#[command(about = "Download a channel and publish it as a podcast feed")]
struct Cli {
    /// Channel configuration file (JSON).
    config: PathBuf,

    /// Directory holding media files, sidecars, state and the feed.
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Downloader executable.
    #[arg(long, default_value = "yt-dlp")]
    downloader: String,

    /// Log at debug level (RUST_LOG still wins).
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_status(&err))
        }
    }
}

/// Configuration errors get their own status so that schedulers can tell a
/// broken channel file from a failed run.
fn exit_status(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<error::Error>() {
        Some(error::Error::Config { .. }) => EXIT_CONFIG,
        _ => EXIT_FAILURE,
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    // The downloader runs inside the working directory, so every path handed
    // to it must not depend on our own current directory.
    let workdir = std::path::absolute(&cli.workdir)
        .with_context(|| format!("resolving working directory {}", cli.workdir.display()))?;
    debug!(workdir = %workdir.display(), "resolved working directory");

    let reconciler = Reconciler::new(workdir, Box::new(YtDlp::new(&cli.downloader)))
        .with_config_path(&cli.config);

    let summary = reconciler
        .run_from_file(&cli.config)
        .with_context(|| format!("reconciling {}", cli.config.display()))?;

    info!(
        fetched = summary.fetched,
        added = summary.added,
        skipped = summary.skipped,
        published = summary.published,
        omitted = summary.omitted,
        removed = summary.removed,
        "run complete"
    );
    Ok(())
}

//! `yt-dlp` fetcher.
//!
//! Runs the downloader as a blocking subprocess inside the working directory.
//! The downloader does all the network work, writes `.info.json` sidecars and
//! maintains the `--download-archive` marker; this module only builds the
//! command line and turns its `--print` output into [`FetchEvent`]s.

use std::ffi::OsString;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::{FetchEvent, FetchRequest, FetchStatus, Fetcher};
use crate::error::{Error, Result};

/// Printed once per item after it has been moved to its final path.
const PRINT_TEMPLATE: &str = "after_move:finished:%(filepath)s";

/// Same naming scheme youtube-dl has always used: `<title>-<id>.<ext>`.
const OUTPUT_TEMPLATE: &str = "%(title)s-%(id)s.%(ext)s";

pub struct YtDlp {
    program: OsString,
}

impl YtDlp {
    /// # Arguments
    ///
    /// * `program`: executable name or path, e.g. `yt-dlp`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Expand a configured channel identifier into something the downloader
    /// accepts. Full URLs pass through.
    pub fn channel_url(channel: &str) -> String {
        let channel = channel.trim();
        if channel.contains("://") {
            channel.to_string()
        } else if channel.starts_with('@') {
            format!("https://www.youtube.com/{channel}/videos")
        } else {
            format!("https://www.youtube.com/user/{channel}/videos")
        }
    }

    pub fn build_args(request: &FetchRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--download-archive".into(),
            request.marker_path.as_os_str().to_owned(),
            "--write-info-json".into(),
            "--no-overwrites".into(),
            "--ignore-errors".into(),
            "--no-progress".into(),
            "--dateafter".into(),
            request.from.into(),
            "--datebefore".into(),
            request.to.into(),
            "--output".into(),
            OUTPUT_TEMPLATE.into(),
            "--print".into(),
            PRINT_TEMPLATE.into(),
        ];
        if let Some(format) = request.format {
            args.push("--format".into());
            args.push(format.into());
        }
        if request.verbose {
            args.push("--verbose".into());
        }
        args.push(Self::channel_url(request.channel).into());
        args
    }

    /// Turn the downloader's stdout into events. Lines that are not of the
    /// form `<status>:<path>` are ignored.
    pub fn parse_events(stdout: &str) -> Vec<FetchEvent> {
        stdout
            .lines()
            .filter_map(|line| {
                let (status, filename) = line.split_once(':')?;
                let filename = filename.trim();
                if filename.is_empty() {
                    return None;
                }
                let status = FetchStatus::parse(status);
                if let FetchStatus::Other(ref other) = status {
                    debug!(line, status = other.as_str(), "ignoring downloader output");
                    return None;
                }
                Some(FetchEvent {
                    status,
                    filename: filename.into(),
                })
            })
            .collect()
    }
}

impl Fetcher for YtDlp {
    fn name(&self) -> &str {
        self.program.to_str().unwrap_or("yt-dlp")
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<Vec<FetchEvent>> {
        let args = Self::build_args(request);
        debug!(program = ?self.program, ?args, "spawning downloader");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(request.workdir)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| Error::Fetch {
                fetcher: self.name().to_string(),
                reason: e.to_string(),
            })?;

        let events = Self::parse_events(&String::from_utf8_lossy(&output.stdout));

        // The downloader exits non-zero as soon as a single item failed, even
        // with --ignore-errors; whatever it reported is still valid.
        if !output.status.success() {
            warn!(
                fetcher = self.name(),
                status = %output.status,
                reported = events.len(),
                "downloader exited with failure"
            );
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn request<'a>(marker: &'a Path, workdir: &'a Path) -> FetchRequest<'a> {
        FetchRequest {
            channel: "@somechannel",
            from: "today-1week",
            to: "today",
            format: None,
            marker_path: marker,
            workdir,
            verbose: false,
        }
    }

    #[test]
    fn channel_url_expands_handles_and_names() {
        assert_eq!(
            YtDlp::channel_url("@caseyneistat"),
            "https://www.youtube.com/@caseyneistat/videos"
        );
        assert_eq!(
            YtDlp::channel_url("LastWeekTonight"),
            "https://www.youtube.com/user/LastWeekTonight/videos"
        );
        assert_eq!(
            YtDlp::channel_url("https://vimeo.com/someone"),
            "https://vimeo.com/someone"
        );
    }

    #[test]
    fn build_args_passes_marker_and_range() {
        let marker = Path::new("/work/archive-0123.txt");
        let args = YtDlp::build_args(&request(marker, Path::new("/work")));

        let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
        assert_eq!(args[pos("--download-archive") + 1], "/work/archive-0123.txt");
        assert_eq!(args[pos("--dateafter") + 1], "today-1week");
        assert_eq!(args[pos("--datebefore") + 1], "today");
        assert!(args.iter().any(|a| a == "--write-info-json"));
        assert!(!args.iter().any(|a| a == "--format"));
        assert!(!args.iter().any(|a| a == "--verbose"));
        assert_eq!(
            args.last().unwrap(),
            "https://www.youtube.com/@somechannel/videos"
        );
    }

    #[test]
    fn build_args_adds_format_and_verbose() {
        let marker = Path::new("m.txt");
        let mut req = request(marker, Path::new("."));
        req.format = Some("22");
        req.verbose = true;

        let args = YtDlp::build_args(&req);
        let pos = args.iter().position(|a| a == "--format").unwrap();
        assert_eq!(args[pos + 1], "22");
        assert!(args.iter().any(|a| a == "--verbose"));
    }

    #[test]
    fn parse_events_reads_finished_lines() {
        let stdout = "finished:/work/five million-UqADuUBMoZ4.mp4\n\
                      noise without colon\n\
                      finished:/work/C: drive-abc.mp4\n";
        let events = YtDlp::parse_events(stdout);

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            FetchEvent::finished("/work/five million-UqADuUBMoZ4.mp4")
        );
        assert_eq!(events[1].filename, Path::new("/work/C: drive-abc.mp4"));
    }

    #[test]
    fn parse_events_skips_unknown_statuses_and_empty_paths() {
        let events = YtDlp::parse_events("[info]: something\nfinished:\nerror:/work/x.mp4\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, FetchStatus::Error);
    }

    #[test]
    fn fetch_fails_when_program_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("m.txt");
        let fetcher = YtDlp::new("/definitely/not/a/real/downloader");

        let err = fetcher.fetch(&request(&marker, dir.path())).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}

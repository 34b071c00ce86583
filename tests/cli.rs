//! End-to-end tests for the yt2rss binary.

use assert_cmd::assert::OutputAssertExt;
use assert_cmd::cargo::CommandCargoExt;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const CONFIG: &str = r#"{
    "channel": "@testchannel",
    "download": { "from": "today-1week", "to": "today", "keep_latest": 1 },
    "rss": {
        "title": "CLI Test Feed",
        "author": "Tester",
        "description": "Feed written by the CLI test",
        "image": "https://example.com/cover.png",
        "feed_base_url": "https://example.com/pod/",
        "feed_output_file_name": "feed.rss",
        "link": "https://example.com"
    }
}"#;

fn yt2rss_cmd() -> Command {
    Command::cargo_bin("yt2rss").unwrap()
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("channel.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn missing_config_exits_with_config_status() {
    let temp_dir = TempDir::new().unwrap();

    yt2rss_cmd()
        .arg(temp_dir.path().join("nope.json"))
        .arg("--workdir")
        .arg(temp_dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid channel configuration"));
}

#[test]
fn malformed_config_exits_with_config_status_and_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), "{ \"channel\": ");

    yt2rss_cmd()
        .arg(&config)
        .arg("--workdir")
        .arg(temp_dir.path())
        .assert()
        .code(2);

    assert!(!temp_dir.path().join("feed.rss").exists());
}

#[test]
fn run_with_idle_downloader_writes_empty_feed() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), CONFIG);
    fs::write(temp_dir.path().join("stray.txt"), "left over").unwrap();

    yt2rss_cmd()
        .arg(&config)
        .arg("--workdir")
        .arg(temp_dir.path())
        .arg("--downloader")
        .arg("true")
        .assert()
        .success()
        .stderr(predicate::str::contains("run complete"));

    let xml = fs::read_to_string(temp_dir.path().join("feed.rss")).unwrap();
    assert!(xml.contains("<title>CLI Test Feed</title>"));
    assert!(!xml.contains("<item>"));
    assert!(config.exists(), "config in workdir must survive the sweep");
    assert!(!temp_dir.path().join("stray.txt").exists());
}

#[test]
fn missing_downloader_still_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(temp_dir.path(), CONFIG);

    yt2rss_cmd()
        .arg(&config)
        .arg("--workdir")
        .arg(temp_dir.path())
        .arg("--downloader")
        .arg("/definitely/not/a/downloader")
        .assert()
        .success()
        .stderr(predicate::str::contains("fetch failed"));

    assert!(temp_dir.path().join("feed.rss").exists());
}

/// Stand-in downloader that only creates the dedup ledger it is pointed at,
/// resolving the path the way the real one would: from its own cwd.
#[cfg(unix)]
fn write_ledger_downloader(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-downloader.sh");
    fs::write(
        &path,
        "#!/bin/sh\n\
         while [ $# -gt 0 ]; do\n\
         \x20 if [ \"$1\" = --download-archive ]; then touch \"$2\" || exit 1; fi\n\
         \x20 shift\n\
         done\n",
    )
    .unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn relative_workdir_keeps_ledger_inside_workdir() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir(root.join("pods")).unwrap();
    write_config(root, CONFIG);
    let downloader = write_ledger_downloader(root);

    yt2rss_cmd()
        .current_dir(root)
        .arg("channel.json")
        .arg("--workdir")
        .arg("pods")
        .arg("--downloader")
        .arg(&downloader)
        .assert()
        .success();

    let ledgers: Vec<_> = fs::read_dir(root.join("pods"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("archive-") && name.ends_with(".txt"))
        .collect();
    assert_eq!(ledgers.len(), 1, "ledger should land in the workdir");
    assert!(!root.join("pods").join("pods").exists());
    assert!(root.join("pods").join("feed.rss").exists());
}

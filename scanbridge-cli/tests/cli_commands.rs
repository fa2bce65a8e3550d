use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn scanbridge_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scanbridge"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, body).expect("write config");
    path
}

fn config_body(scanner_url: &str, polling_secs: u64, feed_url: &str) -> String {
    format!(
        "scanner:\n  url: {scanner_url}\n  access_key: ak\n  secret_key: sk\n\
         sink:\n  kind: elasticsearch\n  url: https://127.0.0.1:9\n  auth: elastic:changeme\n\
         exporter:\n  polling_interval_secs: {polling_secs}\n\
         enrichment:\n  feed_url: {feed_url}\n"
    )
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().expect("home");
    scanbridge_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("run"))
        .stdout(contains("once"))
        .stdout(contains("validate"));
}

#[test]
fn validate_missing_file_exits_with_config_code() {
    let home = TempDir::new().expect("home");
    let missing = home.path().join("nope.yaml");
    scanbridge_cmd(home.path())
        .args(["validate", "--config"])
        .arg(&missing)
        .assert()
        .code(1)
        .stderr(contains("error:"));
}

#[test]
fn validate_default_path_under_home() {
    let home = TempDir::new().expect("home");
    let dir = home.path().join(".scanbridge");
    fs::create_dir_all(&dir).expect("config dir");
    fs::write(
        dir.join("config.yaml"),
        config_body("https://scanner.local:8834", 43_200, "https://feed.local/kev.json"),
    )
    .expect("write config");

    scanbridge_cmd(home.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(contains("is valid (sink: elasticsearch)"));
}

#[test]
fn validate_accepts_good_config() {
    let home = TempDir::new().expect("home");
    let path = write_config(
        &home,
        &config_body("https://scanner.local:8834", 43_200, "https://feed.local/kev.json"),
    );
    scanbridge_cmd(home.path())
        .args(["validate", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("valid"))
        .stdout(contains("warning:").not());
}

#[test]
fn validate_warns_on_short_polling_interval() {
    let home = TempDir::new().expect("home");
    let path = write_config(
        &home,
        &config_body("https://scanner.local:8834", 600, "https://feed.local/kev.json"),
    );
    scanbridge_cmd(home.path())
        .args(["validate", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("warning:"))
        .stdout(contains("1200"));
}

#[test]
fn validate_rejects_plain_http_scanner() {
    let home = TempDir::new().expect("home");
    let path = write_config(
        &home,
        &config_body("http://scanner.local:8834", 43_200, "https://feed.local/kev.json"),
    );
    scanbridge_cmd(home.path())
        .args(["validate", "--config"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(contains("https"));
}

#[test]
fn once_with_invalid_config_exits_with_config_code() {
    let home = TempDir::new().expect("home");
    let path = write_config(
        &home,
        &config_body("http://scanner.local:8834", 43_200, "https://feed.local/kev.json"),
    );
    scanbridge_cmd(home.path())
        .args(["once", "--json", "--config"])
        .arg(&path)
        .assert()
        .code(1)
        .stdout(predicates::str::is_empty());
}

#[test]
fn run_exits_with_one_when_feed_is_unreachable() {
    let home = TempDir::new().expect("home");
    let path = write_config(
        &home,
        &config_body("https://scanner.local:8834", 43_200, "http://127.0.0.1:9/feed.json"),
    );
    scanbridge_cmd(home.path())
        .args(["run", "--config"])
        .arg(&path)
        .assert()
        .code(1)
        .stderr(contains("error:"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    let home = TempDir::new().expect("home");
    scanbridge_cmd(home.path())
        .arg("frobnicate")
        .assert()
        .failure();
}

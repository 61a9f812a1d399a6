//! Startup failures of the `aigamer` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn aigamer() -> Command {
    Command::cargo_bin("aigamer").unwrap()
}

#[test]
fn test_help_lists_flags() {
    aigamer()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--session"))
        .stdout(predicate::str::contains("--no-wait"));
}

#[test]
fn test_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    aigamer()
        .env_remove("AIGAMER_CONFIG")
        .args(["--session", "ci", "--no-wait", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration not found"));
}

#[test]
fn test_invalid_delays_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("appsettings.toml");
    fs::write(&config, "[Loop]\nDefaultDelayMs = 100\n").unwrap();

    aigamer()
        .env_remove("AIGAMER_CONFIG")
        .args(["--session", "ci", "--no-wait", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Loop.DefaultDelayMs"));
}

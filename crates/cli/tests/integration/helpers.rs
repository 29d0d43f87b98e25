//! Test helper utilities for CLI integration tests.

#![allow(deprecated)] // Command::cargo_bin deprecation

use assert_cmd::Command;

/// Create a CLI command with no market config from the environment.
pub fn unn_cmd() -> Command {
    let mut cmd = Command::cargo_bin("unn").unwrap();
    cmd.env_remove("UNN_MARKET_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Absolute path of a fixture file.
pub fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}.json", env!("CARGO_MANIFEST_DIR"), name)
}

/// Run a command expected to succeed with `--format json` and parse its stdout.
pub fn run_json(args: &[&str]) -> serde_json::Value {
    let output = unn_cmd()
        .args(args)
        .args(["--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).unwrap()
}

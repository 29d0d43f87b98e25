//! CLI argument validation tests.
//!
//! These tests verify that the CLI properly validates arguments and provides
//! helpful error messages.

use predicates::prelude::*;

use super::helpers::{fixture_path, unn_cmd};

#[test]
fn test_help_output() {
    unn_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("unn"))
        .stdout(predicate::str::contains("rates"))
        .stdout(predicate::str::contains("curve"))
        .stdout(predicate::str::contains("simulate"));
}

#[test]
fn test_rates_help_output() {
    unn_cmd()
        .args(["rates", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--cash"))
        .stdout(predicate::str::contains("--borrows"))
        .stdout(predicate::str::contains("--reserves"));
}

#[test]
fn test_invalid_command() {
    unn_cmd()
        .arg("invalid_command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_invalid_format() {
    unn_cmd()
        .args(["rates", "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_invalid_amount() {
    unn_cmd()
        .args(["rates", "--cash", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid amount"));
}

#[test]
fn test_curve_zero_steps_rejected() {
    unn_cmd()
        .args(["curve", "--steps", "0"])
        .assert()
        .failure();
}

#[test]
fn test_simulate_missing_scenario() {
    unn_cmd()
        .arg("simulate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

#[test]
fn test_simulate_nonexistent_scenario() {
    unn_cmd()
        .args(["simulate", "/nonexistent/scenario.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scenario"));
}

#[test]
fn test_invalid_market_config() {
    unn_cmd()
        .args(["rates", "--config", fixture_path("invalid_market").as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid market configuration"));
}

#[test]
fn test_config_from_environment() {
    unn_cmd()
        .env("UNN_MARKET_CONFIG", fixture_path("market"))
        .arg("rates")
        .assert()
        .success()
        .stdout(predicate::str::contains("uTT Rates"));
}

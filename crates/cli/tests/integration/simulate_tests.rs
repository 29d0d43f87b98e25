//! Tests for the `simulate` command.

use predicates::prelude::*;

use super::helpers::{fixture_path, run_json, unn_cmd};

#[test]
fn test_simulate_lend_and_borrow_json() {
    let config = fixture_path("market");
    let scenario = fixture_path("lend_and_borrow");
    let json = run_json(&["simulate", &scenario, "--config", &config]);

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 7);
    assert_eq!(steps[0]["ok"], true);
    assert_eq!(steps[0]["block"], 100);
    assert_eq!(steps[3]["block"], 1100);

    // Oversized redeem fails, later steps still run
    assert_eq!(steps[4]["ok"], false);
    assert_eq!(steps[4]["error_kind"], "insufficient_cash");
    assert_eq!(steps[5]["ok"], true);
    assert_eq!(steps[6]["ok"], true);

    let market = &json["market"];
    assert_eq!(market["accrual_block_number"], 1100);
    assert_eq!(market["symbol"], "uTT");
    assert_ne!(market["total_reserves"], "0");

    let events: Vec<&str> = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event"].as_str().unwrap())
        .collect();
    assert_eq!(
        events,
        vec!["mint", "borrow", "accrue_interest", "repay_borrow", "redeem"]
    );
}

#[test]
fn test_simulate_mint_exact_shares() {
    let scenario = fixture_path("mint_small");
    let json = run_json(&["simulate", &scenario]);

    // 100 underlying at 0.02 per share
    assert_eq!(json["market"]["total_supply"], "5000");
    assert_eq!(json["steps"][1]["error_kind"], "insufficient_balance");

    let accounts = json["accounts"].as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["wallet"], "900");
    assert_eq!(accounts[0]["shares"], "5000");
    assert_eq!(accounts[0]["supplied"], "100");
}

#[test]
fn test_simulate_table_output() {
    unn_cmd()
        .args(["simulate", fixture_path("mint_small").as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unn Sample Token (uST)"))
        .stdout(predicate::str::contains("Market State"))
        .stdout(predicate::str::contains("FAILED (insufficient_balance)"))
        .stdout(predicate::str::contains("1 of 2 steps failed"));
}

#[test]
fn test_simulate_logs_to_stderr_only() {
    let output = unn_cmd()
        .args([
            "--verbose",
            "simulate",
            fixture_path("mint_small").as_str(),
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .clone();

    // stdout stays parseable with debug logging enabled
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["market"]["total_supply"], "5000");
    assert!(String::from_utf8_lossy(&output.stderr).contains("market initialized"));
}

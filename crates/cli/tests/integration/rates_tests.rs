//! Tests for the `rates` and `curve` commands.

use predicates::prelude::*;

use super::helpers::{fixture_path, run_json, unn_cmd};

#[test]
fn test_rates_table_output() {
    unn_cmd()
        .args(["rates", "--cash", "500", "--borrows", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("uST Rates"))
        .stdout(predicate::str::contains("Utilization:    50.00%"))
        .stdout(predicate::str::contains("Kink:           95.00%"));
}

#[test]
fn test_rates_json_output() {
    let config = fixture_path("market");
    let json = run_json(&[
        "rates", "--config", &config, "--cash", "200", "--borrows", "800",
    ]);

    assert_eq!(json["cash"], "200");
    assert_eq!(json["borrows"], "800");
    assert!((json["utilization"].as_f64().unwrap() - 0.8).abs() < 1e-12);
    assert!((json["kink"].as_f64().unwrap() - 0.8).abs() < 1e-12);
    // 0.02 + 0.8 * 0.1 per year, spread over blocks
    assert_eq!(json["borrow_rate_per_block"], "47564687975");
}

#[test]
fn test_rates_empty_market_pays_base_rate() {
    let config = fixture_path("market");
    let json = run_json(&["rates", "--config", &config]);

    // 0.02e18 / 2_102_400
    assert_eq!(json["borrow_rate_per_block"], "9512937595");
    assert_eq!(json["supply_rate_per_block"], "0");
}

#[test]
fn test_curve_json_output() {
    let config = fixture_path("market");
    let json = run_json(&["curve", "--config", &config, "--steps", "10"]);
    let points = json.as_array().unwrap();

    assert_eq!(points.len(), 11);
    assert_eq!(points[8]["above_kink"], false);
    assert_eq!(points[9]["above_kink"], true);

    let apys: Vec<f64> = points
        .iter()
        .map(|p| p["borrow_apy"].as_f64().unwrap())
        .collect();
    assert!(apys.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_curve_table_output() {
    unn_cmd()
        .args(["curve", "--steps", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Utilization"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("jump"));
}

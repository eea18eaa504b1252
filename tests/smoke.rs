//! Smoke tests -- verify the binary runs and the subcommands wire up.

use assert_cmd::Command;
use predicates::str::contains;
use std::io::Write;
use tempfile::NamedTempFile;

fn series_file(values: &[f64]) -> NamedTempFile {
    let points: Vec<serde_json::Value> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::json!({
                "timestamp": 1_700_000_000_000i64 + i as i64 * 60_000,
                "value": v,
                "label": "api_latency_ms"
            })
        })
        .collect();
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::Value::Array(points)).unwrap();
    file
}

fn spike_values() -> Vec<f64> {
    let mut values: Vec<f64> = (0..19).map(|i| 10.0 + (i % 3) as f64).collect();
    values.push(100.0);
    values
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("metricmedic").unwrap();
    cmd.env_remove("METRICMEDIC_CONFIG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Multi-algorithm anomaly detection"));
}

#[test]
fn test_cli_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("metricmedic"));
}

#[test]
fn test_detect_report() {
    let file = series_file(&spike_values());
    cmd()
        .args(["detect", "--seed", "7", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("Anomalies: 1 of 20 points flagged"))
        .stdout(contains("critical"));
}

#[test]
fn test_detect_json_single_algorithm() {
    let file = series_file(&spike_values());
    let output = cmd()
        .args(["detect", "--algorithm", "zscore", "--json", "--input"])
        .arg(file.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let results: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results.len(), 20);
    assert_eq!(results[19]["isAnomaly"], true);
    assert_eq!(results[19]["algorithm"], "zscore");
}

#[test]
fn test_detect_short_series() {
    let file = series_file(&[1.0, 2.0]);
    cmd()
        .args(["detect", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("Not enough data"));
}

#[test]
fn test_stats_json() {
    let file = series_file(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let output = cmd().args(["stats", "--json", "--input"]).arg(file.path()).output().unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["mean"], 3.0);
    assert_eq!(stats["trend"], "increasing");
}

#[test]
fn test_patterns_with_incidents() {
    let series = series_file(&spike_values());
    let mut incidents = NamedTempFile::new().unwrap();
    write!(
        incidents,
        r#"[{{"id": "INC-501", "timestamp": {}}}]"#,
        1_700_000_000_000i64 + 19 * 60_000 + 600_000
    )
    .unwrap();

    cmd()
        .args(["patterns", "--seed", "3", "--input"])
        .arg(series.path())
        .arg("--incidents")
        .arg(incidents.path())
        .assert()
        .success()
        .stdout(contains("critical-anomaly"))
        .stdout(contains("INC-501"));
}

#[test]
fn test_compare_and_presets() {
    let file = series_file(&spike_values());
    cmd()
        .args(["compare", "--seed", "1", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("ensemble"));

    cmd().arg("presets").assert().success().stdout(contains("critical"));
}

#[test]
fn test_config_file_sets_sensitivity() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "[detection]\nsensitivity = \"low\"").unwrap();
    let file = series_file(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    // Low sensitivity needs 10 points.
    cmd()
        .arg("--config")
        .arg(config.path())
        .args(["detect", "--input"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(contains("Not enough data: 6 points, 10 required."));
}

#[test]
fn test_missing_input_fails() {
    cmd()
        .args(["detect", "--input", "/nonexistent/series.json"])
        .assert()
        .failure();
}

//! Integration tests for the `caregate quotas` command.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn caregate() -> Command {
    let mut cmd = Command::cargo_bin("caregate").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_quotas_lists_builtin_classes() {
    caregate()
        .arg("quotas")
        .assert()
        .success()
        .stdout(predicate::str::contains("facility_analysis"))
        .stdout(predicate::str::contains("15m"))
        .stdout(predicate::str::contains("identity"));
}

#[test]
fn test_quotas_json() {
    let output = caregate().arg("quotas").arg("--json").output().unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 9);
    let facility = rows.iter().find(|row| row["name"] == "facility_analysis").unwrap();
    assert_eq!(facility["max_requests"], 5);
    assert_eq!(facility["window_ms"], 900_000);
}

#[test]
fn test_quotas_applies_config_override() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("caregate.toml");
    fs::write(&config_path, "[admission.quotas.upload]\nmax_requests = 7\nkey_strategy = \"address\"\n").unwrap();

    let output = caregate().arg("--config").arg(&config_path).arg("quotas").arg("--json").output().unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    let upload = rows.iter().find(|row| row["name"] == "upload").unwrap();
    assert_eq!(upload["max_requests"], 7);
    assert_eq!(upload["key_strategy"], "address");
}

#[test]
fn test_invalid_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("caregate.toml");
    fs::write(&config_path, "[admission.quotas.uploads]\nmax_requests = 7\n").unwrap();

    caregate()
        .arg("--config")
        .arg(&config_path)
        .arg("quotas")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown quota"));
}

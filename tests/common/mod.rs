//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to get a qat command isolated from the user's config and env
pub fn qat_in(tmp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("qat"));
    cmd.current_dir(tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env("HOME", tmp.path())
        .env_remove("QAT_DECIMALS")
        .env_remove("QAT_TESTER")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    qat_in(&tmp).arg("init").assert().success();
    tmp
}

/// Write a file into the project and return its path
pub fn write_file(tmp: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = tmp.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Dental intra-oral report with every required test filled in and passing
pub const PASSING_REPORT: &str = r#"
id: QAR-01HZX3K5N8P9Q2R4S6T8V0W2Y4
title: Dental unit annual QA
equipment:
  type: dental_intraoral
  make: Acme
  location: Room 2
tester: A. Physicist
test_date: 2026-01-15
created: 2026-01-15T10:00:00Z
tests:
  - test: operating_potential
    rows:
      - applied_kvp: 60
        readings: [60.4, 59.8, 60.1]
      - applied_kvp: 70
        readings: [70.5, 69.9, ""]
  - test: timer_accuracy
    rows:
      - set_time_ms: 100
        readings: [101, 99.5]
  - test: output_reproducibility
    rows:
      - kvp: 60
        mas: 8
        readings: [1.02, 1.01, 1.03, 1.02]
  - test: radiation_leakage
    rows:
      - location: Front
        readings: [0.2, 0.3]
      - location: Back
        readings: [0.1]
"#;

/// Same unit with a timer that runs 20% long
pub fn failing_report() -> String {
    PASSING_REPORT.replace("readings: [101, 99.5]", "readings: [120]")
}

pub fn write_passing_report(tmp: &TempDir) -> PathBuf {
    write_file(tmp, "dental.qat.yaml", PASSING_REPORT)
}

/// Create a report with `qat new` and return its path
pub fn create_report(tmp: &TempDir, equipment: &str) -> PathBuf {
    let name = format!("{}.qat.yaml", equipment);
    qat_in(tmp)
        .args(["new", "--type", equipment, "--tester", "T. Ester", "-o", &name])
        .assert()
        .success();
    tmp.path().join(name)
}

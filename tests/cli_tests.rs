//! Integration tests for the ciprobe CLI
//!
//! These tests run the actual binary and verify its output.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the binary to test
#[allow(deprecated)]
fn ciprobe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("ciprobe").unwrap();
    cmd.env_remove("CIPROBE_ROOT")
        .env_remove("CIPROBE_WORKFLOWS_DIR")
        .env_remove("CIPROBE_SENTINEL");
    cmd
}

fn write_workflow(root: &TempDir, name: &str, content: &str) {
    let dir = root.path().join(".github/workflows");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

#[test]
fn test_help_flag() {
    ciprobe_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"));
}

#[test]
fn test_scan_missing_directory_json() {
    let temp_dir = TempDir::new().unwrap();
    ciprobe_cmd()
        .args(["scan", "--root", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"artifact_produced\":false}\n"));
}

#[test]
fn test_scan_finds_artifact() {
    let temp_dir = TempDir::new().unwrap();
    write_workflow(
        &temp_dir,
        "ci.yaml",
        "steps:\n  - uses: Workiva/gha-store-artifacts@v1.0.0\n    with:\n      VERACODE: out.zip\n",
    );

    ciprobe_cmd()
        .args(["scan", "--root", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"artifact_produced\":true"))
        .stdout(predicate::str::contains("ci.yaml"));
}

#[test]
fn test_scan_malformed_logs_warning() {
    let temp_dir = TempDir::new().unwrap();
    write_workflow(&temp_dir, "bad.yaml", "a: [unclosed\n");

    ciprobe_cmd()
        .args(["scan", "--root", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"artifact_produced\":false"))
        .stderr(predicate::str::contains("Error parsing the YAML file"));
}

#[test]
fn test_scan_unreadable_file_logs_read_error() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().join(".github/workflows");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("blob.yaml"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    ciprobe_cmd()
        .args(["scan", "--root", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"artifact_produced\":false"))
        .stderr(predicate::str::contains("Error reading workflow file"))
        .stderr(predicate::str::contains("Error parsing the YAML file").not());
}

#[test]
fn test_scan_custom_tag_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    write_workflow(&temp_dir, "a.yml", "step: !custom {VERACODE: x}\n");
    write_workflow(&temp_dir, "b.yml", "");

    ciprobe_cmd()
        .args(["scan", "--root", temp_dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"artifact_produced\":false}\n"))
        .stderr(predicate::str::contains("Error parsing the YAML file"));
}

#[test]
fn test_scan_text_format_and_env_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    write_workflow(&temp_dir, "ci.yaml", "with:\n  SNYK: yes\n");

    ciprobe_cmd()
        .env("CIPROBE_SENTINEL", "SNYK")
        .args([
            "scan",
            "--root",
            temp_dir.path().to_str().unwrap(),
            "--format",
            "text",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("SNYK"))
        .stdout(predicate::str::contains("found in"));
}

//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the wirenum-cli binary (finds it in target/debug when run via cargo test).
fn wirenum_cli() -> Command {
    cargo_bin_cmd!("wirenum-cli")
}

/// Path to wirenum library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("wirenum")
        .join("tests")
        .join("fixtures")
}

/// Copy a fixture into a temp dir so runs can overwrite it.
fn scratch_copy(name: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::copy(fixtures_dir().join(name), &path).unwrap();
    (dir, path)
}

#[test]
fn test_cli_help() {
    let mut cmd = wirenum_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("E3.series"));
}

#[test]
fn test_cli_version() {
    let mut cmd = wirenum_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_wires_human_output() {
    let (_dir, path) = scratch_copy("panel.json");
    let mut cmd = wirenum_cli();

    cmd.arg("wires").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Wire numbers"))
        .stdout(predicate::str::contains("1A5.A"))
        .stdout(predicate::str::contains("Updated: 4/5"));
}

#[test]
fn test_cli_overwrites_document_in_place() {
    let (_dir, path) = scratch_copy("panel.json");
    let mut cmd = wirenum_cli();

    cmd.arg("wires").arg(&path);
    cmd.assert().success();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\"Wire number\": \"1A5.A\""));
}

#[test]
fn test_cli_output_file() {
    let (dir, path) = scratch_copy("panel.json");
    let out = dir.path().join("out.json");
    let before = std::fs::read_to_string(&path).unwrap();
    let mut cmd = wirenum_cli();

    cmd.arg("all").arg(&path).arg("--output").arg(&out);
    cmd.assert().success();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    let written = std::fs::read_to_string(&out).unwrap();
    assert!(written.contains("\"name\": \"M2D4\""));
}

#[test]
fn test_cli_dry_run_writes_nothing() {
    let (_dir, path) = scratch_copy("panel.json");
    let before = std::fs::read_to_string(&path).unwrap();
    let mut cmd = wirenum_cli();

    cmd.arg("all").arg(&path).arg("--dry-run");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("(dry run)"));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_cli_json_output() {
    let (_dir, path) = scratch_copy("panel.json");
    let mut cmd = wirenum_cli();

    cmd.arg("all").arg(&path).arg("--format").arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["passes"].as_array().unwrap().len(), 3);
    assert_eq!(json["passes"][0]["pass"], "device_designations");
    assert_eq!(json["summary"]["failed"], 0);
}

#[test]
fn test_cli_fail_on_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.json");
    std::fs::write(
        &path,
        r#"{
            "net_segments": [{ "id": 10, "read_only": true }],
            "connections": [{ "id": 100, "signal": "A", "net_segments": [10] }]
        }"#,
    )
    .unwrap();

    let mut cmd = wirenum_cli();
    cmd.arg("wires").arg(&path);
    cmd.assert().success();

    let mut cmd = wirenum_cli();
    cmd.arg("wires").arg(&path).arg("--fail-on-errors");
    cmd.assert().failure().code(1);
}

#[test]
fn test_cli_closed_document_fails() {
    let mut cmd = wirenum_cli();
    cmd.arg("wires")
        .arg(fixtures_dir().join("closed.json"))
        .arg("--dry-run");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Not connected"));
}

#[test]
fn test_cli_missing_document() {
    let mut cmd = wirenum_cli();
    cmd.arg("wires").arg("does-not-exist.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to load document"));
}

#[test]
fn test_cli_config_defaults() {
    let mut cmd = wirenum_cli();
    cmd.arg("config");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("FixWireName"))
        .stdout(predicate::str::contains("lexicographic"));
}

#[test]
fn test_cli_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("wirenum.json");
    std::fs::write(&config, r#"{ "base_label_order": "natural" }"#).unwrap();

    let mut cmd = wirenum_cli();
    cmd.arg("config").arg("--config").arg(&config);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("natural"));
}

#[test]
fn test_cli_invalid_config_rejected() {
    let (dir, path) = scratch_copy("panel.json");
    let config = dir.path().join("bad.json");
    std::fs::write(&config, r#"{ "wire_number_attributes": [] }"#).unwrap();

    let mut cmd = wirenum_cli();
    cmd.arg("wires").arg(&path).arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_cli_ambiguous_terminal_pin_warns() {
    let (_dir, path) = scratch_copy("panel.json");
    let mut cmd = wirenum_cli();
    cmd.arg("wires").arg(&path);
    cmd.assert().success();

    let mut cmd = wirenum_cli();
    cmd.env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("terminal-pins")
        .arg(&path)
        .arg("-v");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("WARN"))
        .stderr(predicate::str::contains("several wire numbers"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains(r#""name": "4""#));
}

#[test]
fn test_cli_config_command_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.json");
    std::fs::write(&config, r#"{ "default_letter_code": " " }"#).unwrap();

    let mut cmd = wirenum_cli();
    cmd.arg("config").arg("--config").arg(&config);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"))
        .stderr(predicate::str::contains("Configuration error"));
}

//! Integration tests for the `tagprobe config` subcommands.
//!
//! Runs the built binary against real TOML files and checks exit codes and
//! rendered output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const EXAMPLE_CONFIG: &str = include_str!("../../tagprobe.toml.example");

/// Path to the `tagprobe` binary built by Cargo for this test run.
fn tagprobe_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tagprobe"))
}

fn tagprobe(config: &Path, args: &[&str]) -> Output {
    Command::new(tagprobe_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("should spawn tagprobe")
}

fn write_config(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).expect("should write config");
    path
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_config_validate_shipped_example() {
    // Given: the example config shipped at the repository root
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "tagprobe.toml", EXAMPLE_CONFIG);

    // When: validating it
    let output = tagprobe(&config_path, &["--output", "json", "config", "validate"]);

    // Then: it is reported valid with exit code 0
    assert_eq!(output.status.code(), Some(0));
    let report = stdout_json(&output);
    assert_eq!(report["valid"], true);
    assert_eq!(report["errors"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_config_validate_malformed_toml() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "bad.toml", "[harness\nregion = \"eu-west-1\"\n");

    let output = tagprobe(&config_path, &["--output", "json", "config", "validate"]);

    assert_eq!(output.status.code(), Some(2));
    let report = stdout_json(&output);
    assert_eq!(report["valid"], false);
    assert_eq!(report["errors"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_config_validate_rejects_zero_attempts() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "tagprobe.toml", "[poller]\nmax_attempts = 0\n");

    let output = tagprobe(&config_path, &["config", "validate"]);

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("INVALID"));
    assert!(stdout.contains("poller.max_attempts"));
}

#[test]
fn test_config_validate_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("absent.toml");

    let output = tagprobe(&config_path, &["--output", "json", "config", "validate"]);

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)["valid"], false);
}

#[test]
fn test_config_show_partial_toml_uses_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(
        &temp_dir,
        "tagprobe.toml",
        "[harness]\nregion = \"us-east-1\"\n",
    );

    let harness = tagprobe(&config_path, &["config", "show", "--section", "harness"]);
    assert_eq!(harness.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&harness.stdout).contains("region = \"us-east-1\""));

    let image = tagprobe(&config_path, &["config", "show", "--section", "image"]);
    assert_eq!(image.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&image.stdout).contains("baseline_tag = \"latest\""));
}

#[test]
fn test_config_show_unknown_section_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = write_config(&temp_dir, "tagprobe.toml", EXAMPLE_CONFIG);

    let output = tagprobe(&config_path, &["config", "show", "--section", "ebpf"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown section: ebpf"));
}

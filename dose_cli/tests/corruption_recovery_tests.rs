//! Corruption recovery tests for doselog.
//!
//! These tests verify the CLI handles:
//! - Corrupted collection files without overwriting them
//! - Empty collection files
//! - Broken or invalid configuration
//! - Malformed arguments

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli(config: &Path, data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("doselog"));
    cmd.arg("--config").arg(config).arg("--data-dir").arg(data_dir);
    cmd
}

fn default_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "").expect("Failed to write config");
    path
}

#[test]
fn test_corrupted_shots_file_is_reported_and_preserved() {
    let temp_dir = setup_test_dir();
    let config = default_config(temp_dir.path());
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let shots_path = data_dir.join("shots.json");
    fs::write(&shots_path, "{ invalid json }}}}").unwrap();

    cli(&config, &data_dir)
        .args(["shot", "log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unreadable"));

    // The broken file must not be replaced by a fresh collection
    let content = fs::read_to_string(&shots_path).unwrap();
    assert_eq!(content, "{ invalid json }}}}");
}

#[test]
fn test_corrupted_wellness_file_fails_summary() {
    let temp_dir = setup_test_dir();
    let config = default_config(temp_dir.path());
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("wellness.json"), "[{\"weight\": ").unwrap();

    cli(&config, &data_dir)
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("wellness.json"));
}

#[test]
fn test_empty_collection_file_is_treated_as_empty() {
    let temp_dir = setup_test_dir();
    let config = default_config(temp_dir.path());
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("shots.json"), "").unwrap();

    cli(&config, &data_dir)
        .args(["shot", "log", "--at", "2024-02-01T10:00:00Z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Streak: 1"));

    let content = fs::read_to_string(data_dir.join("shots.json")).unwrap();
    let shots: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(shots.as_array().unwrap().len(), 1);
}

#[test]
fn test_unparseable_config_fails() {
    let temp_dir = setup_test_dir();
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "[medication\nname = ").unwrap();

    cli(&config, &temp_dir.path().join("data"))
        .arg("summary")
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_values_are_listed() {
    let temp_dir = setup_test_dir();
    let config = temp_dir.path().join("config.toml");
    fs::write(
        &config,
        "[medication]\ndefault_dose_mg = -1.0\n\n[reminders]\ntime = \"25:99\"\n",
    )
    .unwrap();

    cli(&config, &temp_dir.path().join("data"))
        .arg("summary")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration errors"))
        .stderr(predicate::str::contains("Default dose must be positive"));
}

#[test]
fn test_bad_timestamp_argument_is_rejected() {
    let temp_dir = setup_test_dir();
    let config = default_config(temp_dir.path());
    let data_dir = temp_dir.path().join("data");

    cli(&config, &data_dir)
        .args(["shot", "log", "--at", "next tuesday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));

    assert!(!data_dir.join("shots.json").exists());
}

#[test]
fn test_non_positive_dose_is_rejected() {
    let temp_dir = setup_test_dir();
    let config = default_config(temp_dir.path());
    let data_dir = temp_dir.path().join("data");

    cli(&config, &data_dir)
        .args(["shot", "log", "--dose", "0"])
        .assert()
        .failure();

    assert!(!data_dir.join("shots.json").exists());
}

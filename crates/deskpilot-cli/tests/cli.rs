//! Binary-level tests for the subcommands that need no desktop.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deskpilot(settings: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("deskpilot").unwrap();
    cmd.arg("--settings")
        .arg(settings)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GROQ_API_KEY")
        .env_remove("DESKPILOT_DEFAULT_MODEL")
        .env_remove("OLLAMA_BASE_URL")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    Command::cargo_bin("deskpilot")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("providers"));
}

#[test]
fn test_providers_without_keys() {
    let dir = TempDir::new().unwrap();
    deskpilot(&dir.path().join("settings.json"))
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini"))
        .stdout(predicate::str::contains("missing API key"))
        .stdout(predicate::str::contains("ollama"));
}

#[test]
fn test_settings_set_then_get() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    deskpilot(&path)
        .args(["settings", "default_model", "ollama"])
        .assert()
        .success();

    deskpilot(&path)
        .args(["settings", "default_model"])
        .assert()
        .success()
        .stdout(predicate::str::diff("ollama\n"));

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"play_sound_on_completion\": true"));
}

#[test]
fn test_settings_listing_masks_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"gemini_api_key": "super-secret"}"#).unwrap();

    deskpilot(&path)
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("super-secret").not())
        .stdout(predicate::str::contains("********"));
}

#[test]
fn test_settings_clear_api_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, r#"{"gemini_api_key": "super-secret"}"#).unwrap();

    deskpilot(&path)
        .args(["settings", "gemini_api_key", "null"])
        .assert()
        .success();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(!raw.contains("super-secret"));
    deskpilot(&path)
        .args(["settings", "gemini_api_key"])
        .assert()
        .failure();
}

#[test]
fn test_settings_rejects_bad_value() {
    let dir = TempDir::new().unwrap();
    deskpilot(&dir.path().join("settings.json"))
        .args(["settings", "play_sound_on_completion", "loudly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("play_sound_on_completion"));
}

#[test]
fn test_unknown_model_fails_before_running() {
    let dir = TempDir::new().unwrap();
    deskpilot(&dir.path().join("settings.json"))
        .args(["--model", "gpt-4v", "--dry-run", "run", "open", "calculator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown provider"));
}

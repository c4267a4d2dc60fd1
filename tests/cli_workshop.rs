//! Integration tests for the command-line entry point

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn binary() -> Command {
    Command::cargo_bin("narrative-workshop").unwrap()
}

#[test]
fn test_check_reports_findings() {
    let temp_dir = TempDir::new().unwrap();
    let draft = temp_dir.path().join("draft.txt");
    fs::write(
        &draft,
        "Ever since I was a child I loved engines. I felt so proud when it started.",
    )
    .unwrap();

    binary()
        .arg("check")
        .arg(&draft)
        .assert()
        .success()
        .stdout(predicate::str::contains("[critical] cliche"))
        .stdout(predicate::str::contains("[warning] telling_not_showing"));
}

#[test]
fn test_check_clean_text() {
    let temp_dir = TempDir::new().unwrap();
    let draft = temp_dir.path().join("clean.txt");
    fs::write(&draft, "He handed me a socket wrench and said nothing.").unwrap();

    binary()
        .arg("check")
        .arg(&draft)
        .assert()
        .success()
        .stdout(predicate::str::contains("No findings."));
}

#[test]
fn test_missing_file_exits_with_error() {
    binary()
        .args(["check", "/definitely/not/here.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_invalid_config_is_an_argument_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("workshop.toml");
    fs::write(&config, "batch_count = 0\n").unwrap();
    let essay = temp_dir.path().join("essay.txt");
    fs::write(&essay, "A short essay about engines.").unwrap();

    binary()
        .arg("--config")
        .arg(&config)
        .args(["run", "--prompt", "Describe a problem", "--essay"])
        .arg(&essay)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("batch_count"));
}

#[test]
fn test_run_without_credential_fails_before_any_call() {
    let temp_dir = TempDir::new().unwrap();
    let essay = temp_dir.path().join("essay.txt");
    fs::write(&essay, "A short essay about engines.").unwrap();

    binary()
        .args(["run", "--prompt", "Describe a problem", "--essay"])
        .arg(&essay)
        .env("WORKSHOP_API_BASE_URL", "http://127.0.0.1:9")
        .env_remove("ANTHROPIC_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

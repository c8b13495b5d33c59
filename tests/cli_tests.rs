use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Autonomous DAG task orchestrator",
        ))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("logs"));
}

#[test]
fn test_cli_version() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dagpilot"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("orchestrator daemon"))
        .stdout(predicate::str::contains("--interval-secs"));
}

#[test]
fn test_cli_config_help() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_cli_logs_help() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.args(["logs", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--lines"));
}

#[test]
fn test_cli_start_requires_epic() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.arg("start")
        .assert()
        .failure()
        .stderr(predicate::str::contains("EPIC"));
}

#[test]
fn test_cli_rejects_unknown_command() {
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.arg("frobnicate").assert().failure();
}

#[test]
fn test_cli_scan_outside_project_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("dagpilot");
    cmd.current_dir(dir.path())
        .args(["scan", "some-epic"])
        .assert()
        .failure();
}

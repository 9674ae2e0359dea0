//! Binary tests that never reach AWS

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn apcdeploy() -> Command {
    let mut cmd = Command::cargo_bin("apcdeploy").unwrap();
    cmd.env_remove("APCDEPLOY_CONFIG").env_remove("RUST_LOG");
    cmd
}

fn project_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("apcdeploy.yml"),
        "application: web\nconfiguration_profile: settings\nenvironment: prod\ndata_file: data.json\nregion: us-east-1\n",
    )
    .unwrap();
    dir
}

#[test]
fn help_lists_commands() {
    apcdeploy()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("diff"))
                .and(predicate::str::contains("run"))
                .and(predicate::str::contains("status"))
                .and(predicate::str::contains("get"))
                .and(predicate::str::contains("rollback")),
        );
}

#[test]
fn wait_flags_are_mutually_exclusive() {
    apcdeploy()
        .args(["run", "--wait-deploy", "--wait-bake"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn missing_project_file_suggests_init() {
    let dir = tempfile::tempdir().unwrap();
    apcdeploy()
        .current_dir(dir.path())
        .arg("diff")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("apcdeploy init"));
}

#[test]
fn missing_data_file_fails_before_deploying() {
    let dir = project_dir();
    apcdeploy()
        .arg("--config")
        .arg(dir.path().join("apcdeploy.yml"))
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot read data file"));
}

#[test]
fn rollback_without_terminal_requires_yes() {
    let dir = project_dir();
    apcdeploy()
        .arg("-c")
        .arg(dir.path().join("apcdeploy.yml"))
        .arg("rollback")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let dir = project_dir();
    apcdeploy()
        .current_dir(dir.path())
        .args(["init", "--app", "web", "--profile", "settings", "--env", "prod"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

pub fn cconnector() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("cconnector"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("CCONNECTOR_CONFIG_PATH");
    cmd
}

/// A fresh temp directory and the record path inside it.
pub fn temp_config_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("cconnector").join("config.yaml");
    (dir, path)
}

#[test]
fn no_args_shows_help() {
    cconnector()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn help_lists_colon_commands() {
    cconnector()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config:initiate"))
        .stdout(predicate::str::contains("token:generate"))
        .stdout(predicate::str::contains("token:manager"))
        .stdout(predicate::str::contains("token:reset"))
        .stdout(predicate::str::contains("daemon:start"));
}

#[test]
fn version_flag_shows_name() {
    cconnector()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cconnector"));
}

#[test]
fn config_initiate_creates_empty_record() {
    let (_dir, path) = temp_config_path();

    cconnector()
        .arg("--config")
        .arg(&path)
        .arg("config:initiate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file created"));

    let record = cconnector_core::CredentialStore::new(&path)
        .read()
        .expect("read record");
    assert!(record.host_token.is_empty());
    assert!(record.manager_token.is_empty());
}

#[test]
fn config_initiate_overwrites_existing_record() {
    let (_dir, path) = temp_config_path();
    cconnector().arg("--config").arg(&path).arg("config:initiate").assert().success();
    cconnector().arg("--config").arg(&path).arg("token:generate").assert().success();

    cconnector()
        .arg("--config")
        .arg(&path)
        .arg("config:initiate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Overwriting"));

    let record = cconnector_core::CredentialStore::new(&path)
        .read()
        .expect("read record");
    assert!(record.host_token.is_empty());
}

#[test]
fn config_path_can_come_from_env() {
    let (_dir, path) = temp_config_path();
    cconnector()
        .env("CCONNECTOR_CONFIG_PATH", &path)
        .arg("config:initiate")
        .assert()
        .success();
    assert!(path.is_file());
}

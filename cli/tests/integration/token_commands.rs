#![allow(clippy::expect_used)]

use std::path::Path;

use cconnector_core::{CredentialRecord, CredentialStore};
use predicates::prelude::*;

use crate::cli_tests::{cconnector, temp_config_path};

fn initiate(path: &Path) {
    cconnector()
        .arg("--config")
        .arg(path)
        .arg("config:initiate")
        .assert()
        .success();
}

fn record(path: &Path) -> CredentialRecord {
    CredentialStore::new(path).read().expect("read record")
}

fn last_line(output: &[u8]) -> String {
    String::from_utf8_lossy(output)
        .lines()
        .last()
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[test]
fn generate_prints_64_hex_chars_and_persists_them() {
    let (_dir, path) = temp_config_path();
    initiate(&path);

    let output = cconnector()
        .arg("--config")
        .arg(&path)
        .arg("token:generate")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let token = last_line(&output);
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(record(&path).host_token, token);
}

#[test]
fn generate_respects_length() {
    let (_dir, path) = temp_config_path();
    initiate(&path);

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:generate", "--length", "8"])
        .assert()
        .success();
    assert_eq!(record(&path).host_token.len(), 16);
}

#[test]
fn generate_zero_length_fails_with_exit_1() {
    let (_dir, path) = temp_config_path();
    initiate(&path);

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:generate", "--length", "0"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("failed to generate host token"));
    assert!(record(&path).host_token.is_empty());
}

#[test]
fn commands_without_record_point_to_initiate() {
    let (_dir, path) = temp_config_path();

    cconnector()
        .arg("--config")
        .arg(&path)
        .arg("token:generate")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("config:initiate"));
}

#[test]
fn manager_refuses_to_replace_without_force() {
    let (_dir, path) = temp_config_path();
    initiate(&path);

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:manager", "mgr-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Manager token set"));

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:manager", "mgr-2"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("--force"));
    assert_eq!(record(&path).manager_token, "mgr-1");

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:manager", "mgr-2", "--force"])
        .assert()
        .success();
    assert_eq!(record(&path).manager_token, "mgr-2");
}

#[test]
fn reset_clears_manager_and_rotates_host_token() {
    let (_dir, path) = temp_config_path();
    initiate(&path);
    cconnector().arg("--config").arg(&path).arg("token:generate").assert().success();
    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:manager", "mgr-1"])
        .assert()
        .success();
    let before = record(&path);

    let output = cconnector()
        .arg("--config")
        .arg(&path)
        .arg("token:reset")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let after = record(&path);
    assert_eq!(after.manager_token, "");
    assert_ne!(after.host_token, before.host_token);
    assert_eq!(last_line(&output), after.host_token);
}

#[test]
fn status_reports_claim_state() {
    let (_dir, path) = temp_config_path();
    initiate(&path);

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["--quiet", "token:status"])
        .assert()
        .success()
        .stdout(predicate::str::diff("unclaimed\n"));

    cconnector()
        .arg("--config")
        .arg(&path)
        .args(["token:manager", "mgr-1"])
        .assert()
        .success();

    cconnector()
        .arg("--config")
        .arg(&path)
        .arg("token:status")
        .assert()
        .success()
        .stdout(predicate::str::contains("state:  claimed"))
        .stdout(predicate::str::contains("host token:"));
}

use predicates::prelude::*;

use crate::cli_tests::{cconnector, temp_config_path};

#[test]
fn daemon_start_fails_fast_without_engine_socket() {
    let (dir, path) = temp_config_path();

    cconnector()
        .arg("--config")
        .arg(&path)
        .env("CCONNECTOR_DOCKER_SOCKET", dir.path().join("missing.sock"))
        .env("CCONNECTOR_LISTEN_ADDR", "127.0.0.1:0")
        .arg("daemon:start")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("socket does not exist"));
}

#[test]
fn daemon_start_rejects_invalid_listen_addr() {
    let (_dir, path) = temp_config_path();

    cconnector()
        .arg("--config")
        .arg(&path)
        .env("CCONNECTOR_LISTEN_ADDR", "not-an-address")
        .arg("daemon:start")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("CCONNECTOR_"));
}

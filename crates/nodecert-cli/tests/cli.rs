//! Binary-level tests. None of these reach a real CA.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn nodecert(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nodecert").unwrap();
    cmd.env_remove("NODECERT_CERTNAME")
        .env_remove("NODECERT_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .arg("--ssldir")
        .arg(dir.path().join("ssl"))
        .arg("--certname")
        .arg("agent1")
        .arg("--no-color");
    cmd
}

#[test]
fn test_unknown_action_fails() {
    let dir = tempfile::tempdir().unwrap();
    nodecert(&dir)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown action 'frobnicate'"));
}

#[test]
fn test_missing_action_fails() {
    Command::cargo_bin("nodecert")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("ACTION"));
}

#[test]
fn test_status_on_fresh_node() {
    let dir = tempfile::tempdir().unwrap();
    nodecert(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("agent1"))
        .stdout(predicate::str::contains("no key, no certificate"))
        .stdout(predicate::str::contains("run submit_request"));
}

#[test]
fn test_status_json() {
    let dir = tempfile::tempdir().unwrap();
    nodecert(&dir)
        .args(["status", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"stage\": \"no_key_no_cert\""));
}

#[test]
fn test_clean_twice_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    for _ in 0..2 {
        nodecert(&dir)
            .arg("clean")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to clean for 'agent1'"));
    }
}

#[test]
fn test_clean_removes_key_files() {
    let dir = tempfile::tempdir().unwrap();
    let ssl = dir.path().join("ssl");
    std::fs::create_dir_all(ssl.join("private_keys")).unwrap();
    std::fs::create_dir_all(ssl.join("certs")).unwrap();
    std::fs::write(ssl.join("private_keys/agent1.pem"), "key").unwrap();
    std::fs::write(ssl.join("certs/ca.pem"), "ca").unwrap();

    nodecert(&dir)
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed private key"));

    assert!(!ssl.join("private_keys/agent1.pem").exists());
    assert!(ssl.join("certs/ca.pem").exists());
}

#[test]
fn test_unreachable_ca_reports_one_error() {
    let dir = tempfile::tempdir().unwrap();
    nodecert(&dir)
        .args(["verify", "--ca-server", "127.0.0.1", "--ca-port", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: could not verify certificate for 'agent1'"));
}

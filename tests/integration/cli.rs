//! The `postback` binary

use assert_cmd::Command;
use postback::codec::{Value, ValueMap};
use postback::page::{MacProtector, StatePersister};
use predicates::prelude::*;
use std::sync::Arc;
use tempfile::TempDir;

/// Run the binary with an empty config directory so a developer's own
/// config file never leaks into the test.
fn postback() -> (Command, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut cmd = Command::cargo_bin("postback").unwrap();
    cmd.arg("--config").arg(dir.path().join("config.toml"));
    (cmd, dir)
}

#[test]
fn test_decode_prints_layout_and_snapshot() {
    let field = StatePersister::default()
        .encode(&Value::pair(Value::Null, Value::pair("profile@1", Value::Null)))
        .unwrap();

    let (mut cmd, _dir) = postback();
    cmd.arg("decode")
        .arg(&field)
        .assert()
        .success()
        .stdout(predicate::str::contains("layout: profile@1"));
}

#[test]
fn test_decode_lists_control_state() {
    let control: ValueMap = [(Value::from("grid"), Value::Int32(4))].into_iter().collect();
    let field = StatePersister::default()
        .encode(&Value::pair(control, Value::pair("profile@1", Value::Null)))
        .unwrap();

    let (mut cmd, _dir) = postback();
    cmd.arg("decode")
        .arg(&field)
        .assert()
        .success()
        .stdout(predicate::str::contains("control grid: Int32(4)"));
}

#[test]
fn test_decode_prints_plain_values() {
    let field = StatePersister::default()
        .encode(&Value::List(vec![Value::from("a"), Value::Int32(3)]))
        .unwrap();

    let (mut cmd, _dir) = postback();
    cmd.arg("decode")
        .arg(&field)
        .assert()
        .success()
        .stdout(predicate::str::contains("Int32("));
}

#[test]
fn test_decode_verifies_mac() {
    let field = StatePersister::default()
        .with_protector(Arc::new(MacProtector::new(b"k")))
        .encode(&Value::from("x"))
        .unwrap();

    let (mut cmd, _dir) = postback();
    cmd.args(["decode", &field, "--mac-key", "k"]).assert().success();

    let (mut cmd, _dir) = postback();
    cmd.args(["decode", &field, "--mac-key", "wrong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity check failed"));
}

#[test]
fn test_decode_checks_user_key() {
    let field = StatePersister::default()
        .with_protector(Arc::new(MacProtector::new(b"k")))
        .encode_for(&Value::from("x"), Some("alice"))
        .unwrap();

    let (mut cmd, _dir) = postback();
    cmd.args(["decode", &field, "--mac-key", "k", "--user-key", "alice"])
        .assert()
        .success();

    let (mut cmd, _dir) = postback();
    cmd.args(["decode", &field, "--mac-key", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("integrity check failed"));
}

#[test]
fn test_decode_rejects_garbage() {
    let (mut cmd, _dir) = postback();
    cmd.args(["decode", "%%%"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("state corrupted"));
}

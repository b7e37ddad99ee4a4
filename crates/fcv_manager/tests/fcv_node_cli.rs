//! End-to-end checks of the `fcv-node` binary against a temp data directory.

mod common;

use std::path::Path;
use std::process::{Command, Output};

use common::fcv_node_bin;
use serde_json::Value;

fn run(data_dir: &Path, store: &str, args: &[&str]) -> Output {
    Command::new(fcv_node_bin())
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--store")
        .arg(store)
        .args(args)
        .env_remove("FCV_INITIAL")
        .env_remove("FCV_ROLE")
        .env("NO_COLOR", "1")
        .output()
        .expect("run fcv-node")
}

fn run_json(data_dir: &Path, store: &str, args: &[&str]) -> Value {
    let out = run(data_dir, store, args);
    if !out.status.success() {
        panic!(
            "fcv-node {:?} failed\nstdout:\n{}\nstderr:\n{}",
            args,
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        );
    }
    serde_json::from_slice(&out.stdout).expect("parse fcv-node json")
}

fn cli_round_trip(store: &str) {
    let dir = tempfile::tempdir().unwrap();

    let status = run(dir.path(), store, &["status"]);
    assert!(!status.status.success(), "status before init must fail");

    let init = run_json(dir.path(), store, &["init"]);
    assert_eq!(init["created"], true);
    assert_eq!(init["document"]["currentVersion"], "7.1");

    let init_again = run_json(dir.path(), store, &["init"]);
    assert_eq!(init_again["created"], false);

    let down = run_json(dir.path(), store, &["set", "lastLTS"]);
    assert_eq!(down["currentVersion"], "6.0");
    assert_eq!(down["isCleaningServerMetadata"], false);
    assert!(down.get("targetVersion").is_none());

    let status = run_json(dir.path(), store, &["status"]);
    assert_eq!(status["currentVersion"], "6.0");

    let up = run_json(dir.path(), store, &["set", "7.1"]);
    assert_eq!(up["currentVersion"], "7.1");
}

#[test]
fn cli_round_trip_file_store() {
    cli_round_trip("file");
}

#[test]
fn cli_round_trip_fjall_store() {
    cli_round_trip("fjall");
}

#[test]
fn cli_reports_error_code_for_unknown_version() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), "file", &["init"]);

    let out = run(dir.path(), "file", &["set", "4.4"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("code 2"), "stderr:\n{stderr}");
}

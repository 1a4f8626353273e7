//! Create/list/get/update/delete against a real fleetd process.

use crate::prelude::*;

#[test]
fn create_then_list_then_get_round_trip() {
    let daemon = Daemon::start(&minimal_config(21000, 21010));

    daemon
        .fleetctl()
        .args(["instance", "create", "alpha", "--command", "llama-server", "--port", "21001"])
        .assert()
        .success();

    let list = daemon.fleetctl().args(["--format", "json", "instance", "list"]).output().expect("list");
    assert!(list.status.success());
    let instances: serde_json::Value = serde_json::from_slice(&list.stdout).expect("list json");
    assert_eq!(instances.as_array().expect("array").len(), 1);

    let get = daemon.fleetctl().args(["--format", "json", "instance", "get", "alpha"]).output().expect("get");
    assert!(get.status.success());
    let instance: serde_json::Value = serde_json::from_slice(&get.stdout).expect("get json");
    assert_eq!(instance["name"], "alpha");
    assert_eq!(instance["status"], "stopped");
}

#[test]
fn get_missing_instance_fails() {
    let daemon = Daemon::start(&minimal_config(21020, 21030));
    daemon.fleetctl().args(["instance", "get", "ghost"]).assert().failure();
}

#[test]
fn duplicate_create_fails() {
    let daemon = Daemon::start(&minimal_config(21040, 21050));
    daemon
        .fleetctl()
        .args(["instance", "create", "dup", "--command", "llama-server", "--port", "21041"])
        .assert()
        .success();
    daemon
        .fleetctl()
        .args(["instance", "create", "dup", "--command", "llama-server", "--port", "21042"])
        .assert()
        .failure();
}

#[test]
fn delete_removes_a_stopped_instance() {
    let daemon = Daemon::start(&minimal_config(21060, 21070));
    daemon
        .fleetctl()
        .args(["instance", "create", "temp", "--command", "llama-server", "--port", "21061"])
        .assert()
        .success();
    daemon.fleetctl().args(["instance", "delete", "temp"]).assert().success();
    daemon.fleetctl().args(["instance", "get", "temp"]).assert().failure();
}

#[test]
fn update_changes_backend_options() {
    let daemon = Daemon::start(&minimal_config(21080, 21090));
    daemon
        .fleetctl()
        .args(["instance", "create", "web", "--command", "llama-server", "--port", "21081"])
        .assert()
        .success();
    daemon
        .fleetctl()
        .args(["instance", "update", "web", "--idle-timeout-minutes", "5"])
        .assert()
        .success();

    let get = daemon.fleetctl().args(["--format", "json", "instance", "get", "web"]).output().expect("get");
    let instance: serde_json::Value = serde_json::from_slice(&get.stdout).expect("get json");
    assert_eq!(instance["options"]["idle_timeout_minutes"], 5);
}

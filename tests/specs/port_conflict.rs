//! Port allocation invariants: a requested port already
//! held by another instance is rejected, and an out-of-range explicit port
//! is rejected too.

use crate::prelude::*;

#[test]
fn explicit_port_already_in_use_is_rejected() {
    let daemon = Daemon::start(&minimal_config(22000, 22010));
    daemon
        .fleetctl()
        .args(["instance", "create", "first", "--command", "llama-server", "--port", "22001"])
        .assert()
        .success();

    daemon
        .fleetctl()
        .args(["instance", "create", "second", "--command", "llama-server", "--port", "22001"])
        .assert()
        .failure();
}

#[test]
fn explicit_port_outside_configured_range_is_rejected() {
    let daemon = Daemon::start(&minimal_config(22020, 22030));
    daemon
        .fleetctl()
        .args(["instance", "create", "oob", "--command", "llama-server", "--port", "22999"])
        .assert()
        .failure();
}

#[test]
fn omitted_port_is_allocated_from_the_configured_range() {
    let daemon = Daemon::start(&minimal_config(22040, 22050));
    daemon.fleetctl().args(["instance", "create", "auto", "--command", "llama-server"]).assert().success();

    let get = daemon.fleetctl().args(["--format", "json", "instance", "get", "auto"]).output().expect("get");
    let instance: serde_json::Value = serde_json::from_slice(&get.stdout).expect("get json");
    let port = instance["options"]["backend_options"]["port"].as_u64().expect("port");
    assert!((22040..=22050).contains(&port));
}

//! Fleet-wide caps.

use crate::prelude::*;

#[test]
fn max_instances_cap_is_enforced() {
    let config = format!("{}max_instances = 1\n", minimal_config(23000, 23010));
    let daemon = Daemon::start(&config);

    daemon
        .fleetctl()
        .args(["instance", "create", "one", "--command", "llama-server", "--port", "23001"])
        .assert()
        .success();

    daemon
        .fleetctl()
        .args(["instance", "create", "two", "--command", "llama-server", "--port", "23002"])
        .assert()
        .failure();
}

#[test]
fn deleting_an_instance_frees_its_slot_against_the_cap() {
    let config = format!("{}max_instances = 1\n", minimal_config(23020, 23030));
    let daemon = Daemon::start(&config);

    daemon
        .fleetctl()
        .args(["instance", "create", "one", "--command", "llama-server", "--port", "23021"])
        .assert()
        .success();
    daemon.fleetctl().args(["instance", "delete", "one"]).assert().success();

    daemon
        .fleetctl()
        .args(["instance", "create", "two", "--command", "llama-server", "--port", "23022"])
        .assert()
        .success();
}

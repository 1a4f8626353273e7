use super::*;

#[test]
fn resolve_fills_absent_fields_from_defaults() {
    let defaults = Defaults {
        auto_restart: true,
        max_restarts: 3,
        restart_delay_seconds: 5,
        on_demand_start: true,
        idle_timeout_minutes: 10,
    };
    let input = OptionsInput {
        max_restarts: Some(7),
        backend_options: BackendOptions { command: "llama-server".into(), args: vec![], port: 0 },
        ..Default::default()
    };
    let resolved = Options::resolve(input, &defaults);
    assert!(resolved.auto_restart);
    assert_eq!(resolved.max_restarts, 7);
    assert_eq!(resolved.restart_delay_seconds, 5);
    assert!(resolved.on_demand_start);
    assert_eq!(resolved.idle_timeout_minutes, 10);
}

#[test]
fn zero_idle_timeout_is_not_eligible() {
    let opts = Options::test_local(8080, 0);
    assert!(!opts.has_idle_timeout());
}

#[test]
fn nonzero_idle_timeout_is_eligible() {
    let opts = Options::test_local(8080, 5);
    assert!(opts.has_idle_timeout());
}

#[test]
fn nodes_serialize_as_sorted_array_regardless_of_insertion_order() {
    let mut opts = Options::test_local(8080, 0);
    opts.nodes.insert("node-b".into());
    opts.nodes.insert("node-a".into());
    let json = serde_json::to_value(&opts).unwrap();
    assert_eq!(json["nodes"], serde_json::json!(["node-a", "node-b"]));
}

#[test]
fn port_accessors_round_trip() {
    let mut opts = Options::test_local(0, 0);
    assert_eq!(opts.get_port(), 0);
    opts.set_port(9001);
    assert_eq!(opts.get_port(), 9001);
}

use super::*;
use std::path::Path;

fn parse(text: &str) -> Result<Config, ConfigError> {
    Config::parse(text, Path::new("fleet.toml"))
}

#[test]
fn minimal_config_parses_with_defaults() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        "#,
    )
    .unwrap();

    assert_eq!(cfg.local_node.as_str(), "local");
    assert_eq!(cfg.manager.port_range, (8000, 9000));
    assert_eq!(cfg.manager.limits.max_instances, None);
    assert_eq!(cfg.manager.limits.max_running_instances, None);
    assert_eq!(cfg.manager.sweep_interval, Duration::from_secs(5 * 60));
    assert!(cfg.instances_dir.is_none());
}

#[test]
fn negative_limits_mean_unlimited() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        max_instances = -1
        max_running_instances = -1
        "#,
    )
    .unwrap();
    assert_eq!(cfg.manager.limits.max_instances, None);
    assert_eq!(cfg.manager.limits.max_running_instances, None);
}

#[test]
fn nonnegative_limits_are_exact_caps() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        max_instances = 10
        max_running_instances = 2
        "#,
    )
    .unwrap();
    assert_eq!(cfg.manager.limits.max_instances, Some(10));
    assert_eq!(cfg.manager.limits.max_running_instances, Some(2));
}

#[test]
fn zero_or_negative_sweep_interval_defaults_to_five_minutes() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        timeout_check_interval_minutes = 0
        "#,
    )
    .unwrap();
    assert_eq!(cfg.manager.sweep_interval, Duration::from_secs(5 * 60));
}

#[test]
fn positive_sweep_interval_is_honored() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        timeout_check_interval_minutes = 2
        "#,
    )
    .unwrap();
    assert_eq!(cfg.manager.sweep_interval, Duration::from_secs(2 * 60));
}

#[test]
fn invalid_port_range_is_rejected() {
    assert!(matches!(
        parse(
            r#"
            local_node = "local"
            [instances]
            port_range = [9000, 8000]
            "#,
        ),
        Err(ConfigError::InvalidPortRange { .. })
    ));
    assert!(matches!(
        parse(
            r#"
            local_node = "local"
            [instances]
            port_range = [0, 8000]
            "#,
        ),
        Err(ConfigError::InvalidPortRange { .. })
    ));
}

#[test]
fn blank_instances_dir_disables_persistence() {
    let cfg = parse(
        r#"
        local_node = "local"
        [instances]
        port_range = [8000, 9000]
        instances_dir = ""
        "#,
    )
    .unwrap();
    assert!(cfg.instances_dir.is_none());
}

#[test]
fn nonblank_instances_dir_enables_persistence() {
    let cfg = parse(
        r#"
        local_node = "local"
        [instances]
        port_range = [8000, 9000]
        instances_dir = "/var/lib/fleet/instances"
        "#,
    )
    .unwrap();
    assert_eq!(cfg.instances_dir, Some(PathBuf::from("/var/lib/fleet/instances")));
}

#[test]
fn nodes_table_parses_into_node_configs() {
    let cfg = parse(
        r#"
        local_node = "local"

        [nodes.peer-a]
        address = "http://10.0.0.4:8080"
        api_key = "secret"

        [nodes.peer-b]
        address = "http://10.0.0.5:8080"

        [instances]
        port_range = [8000, 9000]
        "#,
    )
    .unwrap();
    assert_eq!(cfg.nodes.len(), 2);
    assert_eq!(cfg.nodes["peer-a"].address, "http://10.0.0.4:8080");
    assert_eq!(cfg.nodes["peer-a"].api_key.as_deref(), Some("secret"));
    assert_eq!(cfg.nodes["peer-b"].api_key, None);
}

#[test]
fn default_fields_apply_only_where_absent() {
    let cfg = parse(
        r#"
        local_node = "local"

        [instances]
        port_range = [8000, 9000]
        default_auto_restart = true
        default_idle_timeout_minutes = 30
        "#,
    )
    .unwrap();
    assert!(cfg.manager.defaults.auto_restart);
    assert_eq!(cfg.manager.defaults.idle_timeout_minutes, 30);
    assert_eq!(cfg.manager.defaults.max_restarts, 0);
}

#[test]
fn malformed_toml_is_a_parse_error() {
    assert!(matches!(parse("not valid toml :::"), Err(ConfigError::Parse { .. })));
}

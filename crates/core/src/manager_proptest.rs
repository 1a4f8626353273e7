//! Property tests for the manager's universal invariants: uniqueness of
//! names under create/delete interleaving, and cap enforcement for
//! `max_instances` regardless of how many creates/deletes are attempted.

use super::*;
use crate::instance::fake::FakeSupervisor;
use crate::options::{BackendOptions, BackendType};
use crate::persist::fake::FakePersister;
use crate::remote::fake::FakeRemoteClient;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn local_input(port: u16) -> OptionsInput {
    OptionsInput {
        auto_restart: Some(false),
        max_restarts: Some(0),
        restart_delay_seconds: Some(0),
        on_demand_start: Some(true),
        idle_timeout_minutes: Some(0),
        environment: BTreeMap::new(),
        nodes: BTreeSet::new(),
        backend_type: BackendType::LlamaCpp,
        backend_options: BackendOptions { command: "llama-server".into(), args: vec![], port },
    }
}

async fn make_manager(max_instances: usize) -> Manager {
    let config = ManagerConfig {
        local_node: NodeName::from("local"),
        port_range: (9000, 9100),
        defaults: Defaults::default(),
        limits: Limits { max_instances: Some(max_instances), max_running_instances: None },
        sweep_interval: Duration::from_secs(3600),
        enable_lru_eviction: false,
        health_wait_timeout: Duration::from_secs(1),
    };
    let supervisor_factory: SupervisorFactory =
        Arc::new(|_name: &str| FakeSupervisor::new() as Arc<dyn ChildSupervisor>);
    Manager::bootstrap(
        config,
        Arc::new(FakePersister::new()),
        Arc::new(FakeRemoteClient::default()),
        Arc::new(crate::clock::FakeClock::default()),
        supervisor_factory,
    )
    .await
    .unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Create(u8),
    Delete(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..8).prop_map(Op::Create), (0u8..8).prop_map(Op::Delete)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any sequence of creates/deletes, the registry's local count
    /// never exceeds `max_instances`, and no two live names collide (the
    /// manager itself already rejects duplicates; this asserts it never
    /// silently lets one through).
    #[test]
    fn cap_and_uniqueness_hold_under_any_sequence(ops in prop::collection::vec(op_strategy(), 0..60)) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let manager = make_manager(3).await;
            let mut live: BTreeSet<String> = BTreeSet::new();

            for (i, op) in ops.into_iter().enumerate() {
                match op {
                    Op::Create(n) => {
                        let name = format!("i{n}");
                        let port = 9000 + (i as u16 % 90);
                        let result = manager.create_instance(&name, local_input(port)).await;
                        match result {
                            Ok(record) => {
                                prop_assert!(!live.contains(&name), "duplicate create for {name:?} succeeded");
                                live.insert(record.name.to_string());
                            }
                            Err(ManagerError::DuplicateName(_)) => {
                                prop_assert!(live.contains(&name));
                            }
                            Err(ManagerError::MaxInstancesReached(max)) => {
                                prop_assert_eq!(max, 3);
                                prop_assert!(live.len() >= 3);
                            }
                            Err(ManagerError::PortInUse { .. }) => {}
                            Err(other) => prop_assert!(false, "unexpected create error: {other}"),
                        }
                    }
                    Op::Delete(n) => {
                        let name = format!("i{n}");
                        let result = manager.delete_instance(&name).await;
                        match result {
                            Ok(()) => {
                                prop_assert!(live.remove(&name));
                            }
                            Err(ManagerError::NotFound(_)) => {
                                prop_assert!(!live.contains(&name));
                            }
                            Err(other) => prop_assert!(false, "unexpected delete error: {other}"),
                        }
                    }
                }
                let snapshot = manager.list_instances().await;
                prop_assert!(snapshot.len() <= 3, "local instance count exceeded max_instances");
                prop_assert_eq!(snapshot.len(), live.len());
            }
            Ok(())
        })?;
    }
}

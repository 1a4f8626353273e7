use super::*;
use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use fleet_core::{BackendOptions, BackendType, Options, Status};
use std::collections::{BTreeMap, BTreeSet, HashMap as StdHashMap};
use std::net::SocketAddr;

fn test_options() -> Options {
    Options {
        auto_restart: false,
        max_restarts: 0,
        restart_delay_seconds: 0,
        on_demand_start: true,
        idle_timeout_minutes: 0,
        environment: BTreeMap::new(),
        nodes: BTreeSet::new(),
        backend_type: BackendType::LlamaCpp,
        backend_options: BackendOptions { command: "llama-server".into(), args: vec![], port: 8080 },
    }
}

fn record(name: &str, status: Status) -> InstanceRecord {
    InstanceRecord { name: name.into(), created: 1_000, status, options: test_options() }
}

async fn spawn_test_peer() -> SocketAddr {
    async fn get_instance(Path(name): Path<String>) -> Json<InstanceRecord> {
        Json(InstanceRecord {
            name: name.into(),
            created: 1_000,
            status: Status::Running,
            options: Options {
                auto_restart: false,
                max_restarts: 0,
                restart_delay_seconds: 0,
                on_demand_start: true,
                idle_timeout_minutes: 0,
                environment: BTreeMap::new(),
                nodes: BTreeSet::new(),
                backend_type: BackendType::LlamaCpp,
                backend_options: BackendOptions {
                    command: "llama-server".into(),
                    args: vec![],
                    port: 8080,
                },
            },
        })
    }

    async fn create_instance(
        Path(name): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Result<Json<InstanceRecord>, StatusCode> {
        if !headers.contains_key("authorization") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        // The manager's Options always carries `nodes`; the client must
        // strip it before forwarding.
        if body.get("nodes").is_some() {
            return Err(StatusCode::BAD_REQUEST);
        }
        Ok(Json(InstanceRecord { name: name.into(), created: 2_000, status: Status::Stopped, options: test_options() }))
    }

    async fn start_instance(Path(name): Path<String>) -> Json<InstanceRecord> {
        Json(record(&name, Status::Running))
    }

    async fn stop_instance(Path(name): Path<String>) -> Json<InstanceRecord> {
        Json(record(&name, Status::Stopped))
    }

    async fn delete_instance(Path(_name): Path<String>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn get_logs(Path(_name): Path<String>, Query(params): Query<StdHashMap<String, String>>) -> String {
        format!("lines={}", params.get("lines").cloned().unwrap_or_default())
    }

    async fn missing() -> (StatusCode, &'static str) {
        (StatusCode::NOT_FOUND, "instance not found")
    }

    let app = Router::new()
        .route("/api/v1/instances/:name/", get(get_instance).post(create_instance).put(get_instance).delete(delete_instance))
        .route("/api/v1/instances/:name/start", post(start_instance))
        .route("/api/v1/instances/:name/stop", post(stop_instance))
        .route("/api/v1/instances/:name/logs", get(get_logs))
        .route("/api/v1/instances/missing/", get(missing));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn node_table(addr: SocketAddr, api_key: Option<&str>) -> StdHashMap<String, NodeConfig> {
    let mut nodes = StdHashMap::new();
    nodes.insert(
        "peer".to_string(),
        NodeConfig { address: format!("http://{addr}"), api_key: api_key.map(String::from) },
    );
    nodes
}

#[tokio::test]
async fn create_then_get_via_configured_route() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, Some("secret")));

    let created = client.create("peer", "alpha", &test_options()).await.unwrap();
    assert_eq!(created.name.as_str(), "alpha");
    client.set_instance_node("alpha", "peer").unwrap();

    let fetched = client.get("alpha").await.unwrap();
    assert_eq!(fetched.status, Status::Running);
}

#[tokio::test]
async fn create_without_api_key_is_unauthorized() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, None));
    let err = client.create("peer", "alpha", &test_options()).await.unwrap_err();
    match err {
        ManagerError::Remote { status, .. } => assert_eq!(status, 401),
        other => panic!("expected Remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn start_stop_round_trip() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, Some("secret")));
    client.set_instance_node("beta", "peer").unwrap();

    let started = client.start("beta").await.unwrap();
    assert_eq!(started.status, Status::Running);
    let stopped = client.stop("beta").await.unwrap();
    assert_eq!(stopped.status, Status::Stopped);
}

#[tokio::test]
async fn delete_succeeds_on_empty_body() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, Some("secret")));
    client.set_instance_node("gamma", "peer").unwrap();
    client.delete("gamma").await.unwrap();
}

#[tokio::test]
async fn get_logs_returns_text_plain_body() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, Some("secret")));
    client.set_instance_node("delta", "peer").unwrap();
    let logs = client.get_logs("delta", 50).await.unwrap();
    assert_eq!(logs, "lines=50");
}

#[tokio::test]
async fn not_found_peer_route_propagates_status_and_body() {
    let addr = spawn_test_peer().await;
    let client = HttpRemoteClient::new(node_table(addr, Some("secret")));
    client.set_instance_node("missing", "peer").unwrap();
    let err = client.get("missing").await.unwrap_err();
    match err {
        ManagerError::Remote { status, body } => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("expected Remote error, got {other:?}"),
    }
}

#[test]
fn set_instance_node_rejects_unknown_node() {
    let client = HttpRemoteClient::new(StdHashMap::new());
    assert!(matches!(client.set_instance_node("a", "nope"), Err(ManagerError::UnknownNode(_))));
}

#[test]
fn get_node_for_instance_is_none_until_routed() {
    let nodes = node_table("127.0.0.1:0".parse().unwrap(), None);
    let client = HttpRemoteClient::new(nodes);
    assert!(client.get_node_for_instance("alpha").is_none());
    client.set_instance_node("alpha", "peer").unwrap();
    assert!(client.get_node_for_instance("alpha").is_some());
    client.remove_instance("alpha");
    assert!(client.get_node_for_instance("alpha").is_none());
}

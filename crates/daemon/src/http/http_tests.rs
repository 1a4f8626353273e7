use super::*;
use fleet_core::instance::fake::FakeSupervisor;
use fleet_core::persist::fake::FakePersister;
use fleet_core::remote::fake::FakeRemoteClient;
use fleet_core::{ChildSupervisor, Defaults, FakeClock, Limits, ManagerConfig, NodeName};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

async fn test_state() -> AppState {
    let config = ManagerConfig {
        local_node: NodeName::from("local"),
        port_range: (9000, 9010),
        defaults: Defaults::default(),
        limits: Limits::default(),
        sweep_interval: Duration::from_secs(3600),
        enable_lru_eviction: true,
        health_wait_timeout: Duration::from_millis(50),
    };
    let manager = fleet_core::Manager::bootstrap(
        config,
        Arc::new(FakePersister::new()),
        Arc::new(FakeRemoteClient::default()),
        Arc::new(FakeClock::new(1_000_000)),
        Arc::new(|_name: &str| FakeSupervisor::new() as Arc<dyn ChildSupervisor>),
    )
    .await
    .expect("bootstrap should not fail against empty persisted state");
    AppState {
        manager,
        health_wait_timeout: Duration::from_millis(50),
        http_client: reqwest::Client::new(),
    }
}

async fn spawn(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server task");
    });
    format!("http://{addr}")
}

fn create_body(port: u16) -> Value {
    json!({
        "on_demand_start": true,
        "idle_timeout_minutes": 0,
        "backend_options": { "command": "llama-server", "args": [], "port": port }
    })
}

#[tokio::test]
async fn healthz_reports_ok() {
    let base = spawn(test_state().await).await;
    let response = reqwest::get(format!("{base}/healthz")).await.expect("request");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.expect("body"), "ok");
}

#[tokio::test]
async fn create_then_list_then_get_round_trip() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();

    let created = client
        .post(format!("{base}/api/v1/instances/alpha/"))
        .json(&create_body(9001))
        .send()
        .await
        .expect("create request");
    assert_eq!(created.status(), reqwest::StatusCode::OK);
    let created: Value = created.json().await.expect("create body");
    assert_eq!(created["name"], "alpha");
    assert_eq!(created["status"], "stopped");

    let listed: Vec<Value> =
        client.get(format!("{base}/api/v1/instances/")).send().await.expect("list").json().await.expect("list body");
    assert_eq!(listed.len(), 1);

    let fetched: Value = client
        .get(format!("{base}/api/v1/instances/alpha/"))
        .send()
        .await
        .expect("get")
        .json()
        .await
        .expect("get body");
    assert_eq!(fetched["name"], "alpha");
}

#[tokio::test]
async fn duplicate_create_returns_conflict() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/instances/dup/"))
        .json(&create_body(9002))
        .send()
        .await
        .expect("first create");

    let response = client
        .post(format!("{base}/api/v1/instances/dup/"))
        .json(&create_body(9003))
        .send()
        .await
        .expect("second create");
    assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn get_missing_instance_returns_not_found() {
    let base = spawn(test_state().await).await;
    let response =
        reqwest::get(format!("{base}/api/v1/instances/missing/")).await.expect("request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn start_stop_restart_and_delete_lifecycle() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/instances/worker/"))
        .json(&create_body(9004))
        .send()
        .await
        .expect("create");

    let started: Value = client
        .post(format!("{base}/api/v1/instances/worker/start"))
        .send()
        .await
        .expect("start")
        .json()
        .await
        .expect("start body");
    assert_eq!(started["status"], "running");

    let restarted: Value = client
        .post(format!("{base}/api/v1/instances/worker/restart"))
        .send()
        .await
        .expect("restart")
        .json()
        .await
        .expect("restart body");
    assert_eq!(restarted["status"], "running");

    let stopped: Value = client
        .post(format!("{base}/api/v1/instances/worker/stop"))
        .send()
        .await
        .expect("stop")
        .json()
        .await
        .expect("stop body");
    assert_eq!(stopped["status"], "stopped");

    let deleted = client
        .delete(format!("{base}/api/v1/instances/worker/"))
        .send()
        .await
        .expect("delete");
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let missing = reqwest::get(format!("{base}/api/v1/instances/worker/")).await.expect("get");
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logs_endpoint_returns_text() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/api/v1/instances/logger/"))
        .json(&create_body(9005))
        .send()
        .await
        .expect("create");

    let response = client
        .get(format!("{base}/api/v1/instances/logger/logs?lines=50"))
        .send()
        .await
        .expect("logs request");
    assert!(response.status().is_success());
    // FakeSupervisor never writes anything, so the tail is simply empty.
    assert_eq!(response.text().await.expect("logs body"), "");
}

#[tokio::test]
async fn chat_dispatch_without_model_field_is_bad_request() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&json!({ "messages": [] }))
        .send()
        .await
        .expect("chat request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_dispatch_for_unknown_model_is_not_found() {
    let base = spawn(test_state().await).await;
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/v1/chat/completions"))
        .json(&json!({ "model": "ghost", "messages": [] }))
        .send()
        .await
        .expect("chat request");
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

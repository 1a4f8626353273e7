// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet Daemon (fleetd)
//!
//! Owns the instance manager and exposes it over HTTP: the peer
//! protocol other nodes' [`fleet_remote::HttpRemoteClient`] speaks, and a
//! thin model-routed inference dispatcher.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod env;
mod http;
mod supervisor;

use std::sync::Arc;

use config::Config;
use fleet_core::{ChildSupervisor, Clock, Manager, NullPersister, Persister, RemoteClient, SystemClock};
use fleet_remote::HttpRemoteClient;
use fleet_storage::FilePersister;
use supervisor::ProcessSupervisor;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("fleetd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("fleetd {}", env!("CARGO_PKG_VERSION"));
                println!("Fleet control-plane daemon: supervises inference-backend instances.");
                println!();
                println!("USAGE:");
                println!("    fleetd");
                println!();
                println!("Configuration is read from FLEET_CONFIG (default: ./fleet.toml).");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: fleetd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let filter = tracing_subscriber::EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::config_path();
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path.display(), error = %e, "failed to load configuration");
        e
    })?;

    let persister: Arc<dyn Persister> = match resolve_instances_dir(&config) {
        Some(dir) => {
            info!(dir = %dir.display(), "persisting instances to disk");
            Arc::new(FilePersister::new(&dir)?)
        }
        None => {
            info!("instance persistence disabled");
            Arc::new(NullPersister)
        }
    };

    let remote: Arc<dyn RemoteClient> = Arc::new(HttpRemoteClient::new(config.nodes.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let supervisor_factory: fleet_core::manager::SupervisorFactory =
        Arc::new(|name: &str| ProcessSupervisor::new(name) as Arc<dyn ChildSupervisor>);

    let manager = Manager::bootstrap(config.manager, persister, remote, clock, supervisor_factory).await?;

    let health_wait_timeout = std::time::Duration::from_secs(30);
    let state = http::AppState {
        manager: manager.clone(),
        health_wait_timeout,
        http_client: reqwest::Client::new(),
    };

    let listen_addr = env::listen_addr();
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "fleetd ready");
    println!("READY");

    let app = http::router(state);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
        }
    });

    if let Err(e) = server.await {
        error!(error = %e, "HTTP server exited with an error");
    }

    // Best-effort: stop the sweeper and every local running instance before
    // the process exits.
    manager.shutdown().await;
    info!("fleetd stopped");
    Ok(())
}

/// Resolves a relative `instances_dir` against the state directory.
fn resolve_instances_dir(config: &Config) -> Option<std::path::PathBuf> {
    let dir = config.instances_dir.as_ref()?;
    if dir.is_relative() {
        Some(env::state_dir().join(dir))
    } else {
        Some(dir.clone())
    }
}

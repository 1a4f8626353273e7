// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetctl instance` - instance management commands.

use crate::client::{ClientError, CreateOrUpdateBody, DaemonClient};
use crate::exit_error::ExitError;
use crate::output::{format_or_json, handle_list, OutputFormat};
use clap::{Args, Subcommand};
use fleet_core::BackendType;
use std::collections::BTreeMap;

#[derive(Args)]
pub struct InstanceArgs {
    #[command(subcommand)]
    pub command: InstanceCommand,
}

#[derive(Subcommand)]
pub enum InstanceCommand {
    /// List every instance known to this node
    List,
    /// Show one instance
    Get {
        /// Instance name
        name: String,
    },
    /// Create a new instance
    Create {
        /// Instance name
        name: String,
        /// Backend launch command, e.g. "llama-server"
        #[arg(long)]
        command: String,
        /// Backend launch arguments
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Fixed port; omit to let fleetd allocate one
        #[arg(long)]
        port: Option<u16>,
        /// Restart automatically after an unexpected exit
        #[arg(long)]
        auto_restart: bool,
        /// Maximum automatic restarts before giving up
        #[arg(long)]
        max_restarts: Option<u32>,
        /// Delay between automatic restarts, in seconds
        #[arg(long)]
        restart_delay_seconds: Option<u32>,
        /// Start this instance lazily on its first routed request
        #[arg(long)]
        on_demand_start: bool,
        /// Stop after this many idle minutes (0 disables)
        #[arg(long)]
        idle_timeout_minutes: Option<u32>,
        /// Environment variable to pass to the backend (repeatable: --env KEY=VALUE)
        #[arg(long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,
    },
    /// Update an existing instance's options
    Update {
        /// Instance name
        name: String,
        #[arg(long)]
        command: Option<String>,
        #[arg(long = "arg")]
        args: Vec<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        auto_restart: Option<bool>,
        #[arg(long)]
        max_restarts: Option<u32>,
        #[arg(long)]
        restart_delay_seconds: Option<u32>,
        #[arg(long)]
        on_demand_start: Option<bool>,
        #[arg(long)]
        idle_timeout_minutes: Option<u32>,
        #[arg(long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,
    },
    /// Delete a stopped instance
    Delete {
        /// Instance name
        name: String,
    },
    /// Start an instance's backend process
    Start {
        /// Instance name
        name: String,
    },
    /// Stop an instance's backend process
    Stop {
        /// Instance name
        name: String,
    },
    /// Restart an instance's backend process
    Restart {
        /// Instance name
        name: String,
    },
    /// Show recent backend output for an instance
    Logs {
        /// Instance name
        name: String,
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "100")]
        lines: usize,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) => Ok((key.to_string(), value.to_string())),
        None => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

fn map_client_error(e: ClientError) -> ExitError {
    match &e {
        ClientError::Connect { .. } => ExitError::new(2, e.to_string()),
        ClientError::Server { .. } | ClientError::Request(_) => ExitError::new(1, e.to_string()),
    }
}

pub fn instance(args: InstanceArgs, format: OutputFormat) -> Result<(), ExitError> {
    let client = DaemonClient::connect().map_err(map_client_error)?;
    match args.command {
        InstanceCommand::List => list(&client, format),
        InstanceCommand::Get { name } => get(&client, &name, format),
        InstanceCommand::Create {
            name,
            command,
            args,
            port,
            auto_restart,
            max_restarts,
            restart_delay_seconds,
            on_demand_start,
            idle_timeout_minutes,
            env,
        } => {
            let body = CreateOrUpdateBody {
                auto_restart: Some(auto_restart),
                max_restarts,
                restart_delay_seconds,
                on_demand_start: Some(on_demand_start),
                idle_timeout_minutes,
                environment: env.into_iter().collect::<BTreeMap<_, _>>(),
                backend_type: BackendType::LlamaCpp,
                backend_options: fleet_core::BackendOptions { command, args, port: port.unwrap_or(0) },
            };
            create(&client, &name, &body, format)
        }
        InstanceCommand::Update {
            name,
            command,
            args,
            port,
            auto_restart,
            max_restarts,
            restart_delay_seconds,
            on_demand_start,
            idle_timeout_minutes,
            env,
        } => {
            let existing = client.get(&name).map_err(map_client_error)?;
            let body = CreateOrUpdateBody {
                auto_restart,
                max_restarts,
                restart_delay_seconds,
                on_demand_start,
                idle_timeout_minutes,
                environment: if env.is_empty() {
                    existing.options.environment.clone()
                } else {
                    env.into_iter().collect::<BTreeMap<_, _>>()
                },
                backend_type: existing.options.backend_type,
                backend_options: fleet_core::BackendOptions {
                    command: command.unwrap_or_else(|| existing.options.backend_options.command.clone()),
                    args: if args.is_empty() { existing.options.backend_options.args.clone() } else { args },
                    port: port.unwrap_or(existing.options.backend_options.port),
                },
            };
            update(&client, &name, &body, format)
        }
        InstanceCommand::Delete { name } => delete(&client, &name),
        InstanceCommand::Start { name } => start(&client, &name, format),
        InstanceCommand::Stop { name } => stop(&client, &name, format),
        InstanceCommand::Restart { name } => restart(&client, &name, format),
        InstanceCommand::Logs { name, lines } => logs(&client, &name, lines),
    }
}

fn list(client: &DaemonClient, format: OutputFormat) -> Result<(), ExitError> {
    let instances = client.list().map_err(map_client_error)?;
    handle_list(format, &instances).map_err(|e| ExitError::new(1, e.to_string()))
}

fn get(client: &DaemonClient, name: &str, format: OutputFormat) -> Result<(), ExitError> {
    let instance = client.get(name).map_err(map_client_error)?;
    format_or_json(format, &instance, || {
        println!("name:    {}", instance.name);
        println!("status:  {}", instance.status);
        println!("port:    {}", instance.options.get_port());
        println!("command: {}", instance.options.backend_options.command);
    })
    .map_err(|e| ExitError::new(1, e.to_string()))
}

fn create(
    client: &DaemonClient,
    name: &str,
    body: &CreateOrUpdateBody,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let instance = client.create(name, body).map_err(map_client_error)?;
    format_or_json(format, &instance, || println!("created {} (port {})", instance.name, instance.options.get_port()))
        .map_err(|e| ExitError::new(1, e.to_string()))
}

fn update(
    client: &DaemonClient,
    name: &str,
    body: &CreateOrUpdateBody,
    format: OutputFormat,
) -> Result<(), ExitError> {
    let instance = client.update(name, body).map_err(map_client_error)?;
    format_or_json(format, &instance, || println!("updated {}", instance.name))
        .map_err(|e| ExitError::new(1, e.to_string()))
}

fn delete(client: &DaemonClient, name: &str) -> Result<(), ExitError> {
    client.delete(name).map_err(map_client_error)?;
    println!("deleted {name}");
    Ok(())
}

fn start(client: &DaemonClient, name: &str, format: OutputFormat) -> Result<(), ExitError> {
    let instance = client.start(name).map_err(map_client_error)?;
    format_or_json(format, &instance, || println!("{} is now {}", instance.name, instance.status))
        .map_err(|e| ExitError::new(1, e.to_string()))
}

fn stop(client: &DaemonClient, name: &str, format: OutputFormat) -> Result<(), ExitError> {
    let instance = client.stop(name).map_err(map_client_error)?;
    format_or_json(format, &instance, || println!("{} is now {}", instance.name, instance.status))
        .map_err(|e| ExitError::new(1, e.to_string()))
}

fn restart(client: &DaemonClient, name: &str, format: OutputFormat) -> Result<(), ExitError> {
    let instance = client.restart(name).map_err(map_client_error)?;
    format_or_json(format, &instance, || println!("{} is now {}", instance.name, instance.status))
        .map_err(|e| ExitError::new(1, e.to_string()))
}

fn logs(client: &DaemonClient, name: &str, lines: usize) -> Result<(), ExitError> {
    let text = client.logs(name, lines).map_err(map_client_error)?;
    print!("{text}");
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fleetctl` - command-line client for fleetd's peer protocol.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod exit_error;
mod output;

use clap::{Parser, Subcommand};
use commands::instance::{instance, InstanceArgs};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "fleetctl", version, about = "Control client for fleetd")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage instances on this node
    Instance(InstanceArgs),
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Instance(args) => instance(args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.code);
    }
}

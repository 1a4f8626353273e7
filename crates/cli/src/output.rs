// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared text/JSON rendering for commands.

use clap::ValueEnum;
use fleet_core::InstanceRecord;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Format-branch helper for single-record commands (get, start, stop, ...).
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
        OutputFormat::Text => text_fn(),
    }
    Ok(())
}

/// Render a list of instances as text or JSON.
pub fn handle_list(format: OutputFormat, instances: &[InstanceRecord]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(instances)?),
        OutputFormat::Text => {
            if instances.is_empty() {
                println!("No instances.");
                return Ok(());
            }
            println!("{:<20} {:<10} {:<8} {:<8}", "NAME", "STATUS", "PORT", "NODES");
            for instance in instances {
                let nodes = if instance.options.nodes.is_empty() {
                    "-".to_string()
                } else {
                    instance.options.nodes.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(",")
                };
                println!(
                    "{:<20} {:<10} {:<8} {:<8}",
                    instance.name,
                    instance.status,
                    instance.options.get_port(),
                    nodes
                );
            }
        }
    }
    Ok(())
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the crewplane CLI

use anyhow::{Context, Result};
use colored::Colorize;

use crate::daemon::{check_daemon_running, DaemonClient, DaemonStatus};

pub mod agent;
pub mod config;
pub mod daemon;
pub mod event;
pub mod handoff;
pub mod phase;
pub mod task;
pub mod workflow;

pub use self::agent::AgentCommand;
pub use self::config::ConfigCommand;
pub use self::daemon::DaemonCommand;
pub use self::event::EventCommand;
pub use self::handoff::HandoffCommand;
pub use self::phase::PhaseCommand;
pub use self::task::TaskCommand;
pub use self::workflow::WorkflowCommand;

/// Client for a healthy daemon, or `None` after telling the user why not.
pub(crate) async fn connect(host: &str, port: u16) -> Result<Option<DaemonClient>> {
    match check_daemon_running(host, port).await {
        Ok(DaemonStatus::Running { .. }) => Ok(Some(DaemonClient::new(host, port)?)),
        Ok(DaemonStatus::Unhealthy { pid, error }) => {
            println!(
                "{}",
                format!("⚠ Daemon is running (PID: {}) but unhealthy: {}", pid, error).yellow()
            );
            println!("Run 'crewplane daemon status' for more info.");
            Ok(None)
        }
        _ => {
            println!("{}", "This command requires the daemon to be running.".red());
            println!("Run 'crewplane daemon start' to start the daemon.");
            Ok(None)
        }
    }
}

/// JSON given inline or as `@path/to/file.json`; `{}` when absent.
pub(crate) fn parse_input(input: Option<String>) -> Result<serde_json::Value> {
    match input {
        None => Ok(serde_json::json!({})),
        Some(s) if s.starts_with('@') => {
            let path = &s[1..];
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file: {}", path))?;
            serde_json::from_str(&content).context("Failed to parse input JSON")
        }
        Some(s) => serde_json::from_str(&s).context("Failed to parse input JSON"),
    }
}

pub(crate) fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

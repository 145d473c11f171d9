// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;

use crewplane_core::domain::agent::AgentStatus;

use super::{connect, parse_input, print_json};
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum AgentCommand {
    /// List registered agents
    List,

    /// Poll every known agent's /status endpoint
    Status,

    /// Call an agent's /execute endpoint through the control plane
    Execute {
        /// Agent name or role (e.g. qa_engineer)
        #[arg(value_name = "AGENT")]
        agent: String,

        /// Payload (JSON string or @file.json)
        #[arg(short, long, value_name = "INPUT")]
        input: Option<String>,
    },

    /// Stream registry changes (registrations, liveness transitions)
    Watch,
}

pub async fn handle_command(command: AgentCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        AgentCommand::List => list_agents(client).await,
        AgentCommand::Status => agent_status(client).await,
        AgentCommand::Execute { agent, input } => execute(client, &agent, input).await,
        AgentCommand::Watch => watch(client).await,
    }
}

async fn list_agents(client: DaemonClient) -> Result<()> {
    let agents = client.list_agents().await?;

    if agents.is_empty() {
        println!("{}", "No agents registered".yellow());
        return Ok(());
    }

    println!("{} agents registered:", agents.len());
    println!(
        "{:<38} {:<20} {:<20} {:<10} {:<8} LAST HEARTBEAT",
        "ID", "NAME", "ROLE", "VERSION", "STATUS"
    );

    for agent in agents {
        println!(
            "{:<38} {:<20} {:<20} {:<10} {:<8} {}",
            agent.id.to_string(),
            agent.name.bold(),
            agent.role,
            agent.version,
            format_status(agent.status),
            agent.last_heartbeat_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

async fn agent_status(client: DaemonClient) -> Result<()> {
    let statuses = client.agent_status().await?;
    for (name, report) in statuses {
        let status = report["status"].as_str().unwrap_or("unknown");
        let marker = if status == "online" {
            "✓".green()
        } else {
            "✗".red()
        };
        println!(
            "{} {:<22} {:<8} {}",
            marker,
            name.bold(),
            status,
            report["url"].as_str().unwrap_or_default().dimmed()
        );
        if let Some(error) = report.get("error").and_then(Value::as_str) {
            println!("    {}", error.dimmed());
        }
    }
    Ok(())
}

async fn execute(client: DaemonClient, agent: &str, input: Option<String>) -> Result<()> {
    let payload = parse_input(input)?;
    let response = client.execute_agent(agent, payload).await?;
    print_json(&response)
}

async fn watch(client: DaemonClient) -> Result<()> {
    println!("Watching registry on {} (Ctrl+C to stop)", client.base_url());
    client
        .stream("/agents/watch", |_, event| {
            println!("{}", event);
        })
        .await
}

fn format_status(status: AgentStatus) -> colored::ColoredString {
    match status {
        AgentStatus::Active => "active".green(),
        AgentStatus::Stale => "stale".yellow(),
        AgentStatus::Offline => "offline".red(),
    }
}

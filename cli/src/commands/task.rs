// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Task commands
//!
//! Commands: plan, status, handoffs

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crewplane_core::domain::task::TaskStatus;

use super::{connect, parse_input, print_json};
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Submit a task for planning
    Plan {
        /// Task description
        #[arg(value_name = "TASK")]
        task: String,

        /// Context (JSON string or @file.json)
        #[arg(short, long, value_name = "CONTEXT")]
        context: Option<String>,
    },

    /// Show a task's status
    Status {
        #[arg(value_name = "TASK_ID")]
        task_id: String,

        /// Print the full task record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a task's handoff history
    Handoffs {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
}

pub async fn handle_command(command: TaskCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        TaskCommand::Plan { task, context } => plan(client, &task, context).await,
        TaskCommand::Status { task_id, json } => status(client, &task_id, json).await,
        TaskCommand::Handoffs { task_id } => handoffs(client, &task_id).await,
    }
}

async fn plan(client: DaemonClient, task: &str, context: Option<String>) -> Result<()> {
    let context = parse_input(context)?;
    let receipt = client.plan(task, context).await?;

    println!("{}", format!("✓ Task submitted: {}", receipt.task_id).green());
    println!("  Status: {}", format_status(receipt.status));
    println!("  Recommended agent: {}", receipt.recommended_agent.to_string().bold());
    let assigned: Vec<String> = receipt.assigned_agents.iter().map(ToString::to_string).collect();
    println!("  Assigned: {}", assigned.join(", "));
    println!("Check progress with: crewplane task status {}", receipt.task_id);
    Ok(())
}

async fn status(client: DaemonClient, task_id: &str, json: bool) -> Result<()> {
    let task = client.get_task(task_id).await?;
    if json {
        return print_json(&task);
    }

    println!("{} {}", "Task:".bold(), task.task_id);
    println!("  Description: {}", task.description);
    println!("  Status: {}", format_status(task.status));
    if let Some(agent) = &task.assigned_agent {
        println!("  Assigned agent: {}", agent);
    }
    if let Some(error) = &task.error {
        println!("  Error: {}", error.red());
    }
    println!("  Updated: {}", task.updated_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

async fn handoffs(client: DaemonClient, task_id: &str) -> Result<()> {
    let history = client.task_handoffs(task_id).await?;
    if history.is_empty() {
        println!("{}", "No handoffs recorded".yellow());
        return Ok(());
    }
    for entry in history {
        println!(
            "  {}  {} → {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.source,
            entry.target.bold()
        );
    }
    Ok(())
}

fn format_status(status: TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Completed => "completed".green(),
        TaskStatus::Error => "error".red(),
        other => other.as_str().yellow(),
    }
}

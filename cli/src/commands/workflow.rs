// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Workflow commands
//!
//! Commands: start, status

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::{connect, print_json};
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Start a predefined workflow (feature, bugfix, refactor, security_audit)
    Start {
        #[arg(value_name = "TYPE")]
        workflow_type: String,

        /// What the workflow is for
        #[arg(value_name = "DESCRIPTION")]
        description: String,
    },

    /// Show a started workflow
    Status {
        #[arg(value_name = "WORKFLOW_ID")]
        workflow_id: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle_command(command: WorkflowCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        WorkflowCommand::Start {
            workflow_type,
            description,
        } => start(client, &workflow_type, &description).await,
        WorkflowCommand::Status { workflow_id, json } => status(client, &workflow_id, json).await,
    }
}

async fn start(client: DaemonClient, workflow_type: &str, description: &str) -> Result<()> {
    let receipt = client.start_workflow(workflow_type, description).await?;

    println!("{}", format!("✓ Workflow started: {}", receipt.workflow_id).green());
    let agents: Vec<String> = receipt.agents.iter().map(ToString::to_string).collect();
    println!("  Sequence: {}", agents.join(" → "));
    Ok(())
}

async fn status(client: DaemonClient, workflow_id: &str, json: bool) -> Result<()> {
    let workflow = client.get_workflow(workflow_id).await?;
    if json {
        return print_json(&workflow);
    }

    println!("{} {}", "Workflow:".bold(), workflow.workflow_id);
    println!("  Type: {}", workflow.workflow_type);
    println!("  Description: {}", workflow.description);
    println!("  Status: {}", workflow.status.as_str().yellow());
    for (step, role) in workflow.agents.iter().enumerate() {
        println!("  {}. {}", step + 1, role);
    }
    println!("  Created: {}", workflow.created_at.format("%Y-%m-%d %H:%M:%S"));
    Ok(())
}

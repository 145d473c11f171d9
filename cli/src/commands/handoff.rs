// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crewplane_core::domain::handoff::{HandoffOutcome, HandoffRequest};

use super::{connect, parse_input};
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum HandoffCommand {
    /// Hand a task from one agent to another
    Send {
        #[arg(long)]
        from: String,

        /// Target agent name or role
        #[arg(long)]
        to: String,

        #[arg(long)]
        task_id: String,

        /// Context (JSON string or @file.json)
        #[arg(short, long)]
        context: Option<String>,
    },

    /// List handoffs parked because their target was not routable
    Queued,
}

pub async fn handle_command(command: HandoffCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        HandoffCommand::Send {
            from,
            to,
            task_id,
            context,
        } => {
            let request = HandoffRequest {
                source_agent: from,
                target_agent: to,
                task_id,
                context: parse_input(context)?,
                artifacts: Vec::new(),
            };
            send(client, request).await
        }
        HandoffCommand::Queued => queued(client).await,
    }
}

async fn send(client: DaemonClient, request: HandoffRequest) -> Result<()> {
    match client.handoff(&request).await? {
        HandoffOutcome::Accepted { task_id, target } => {
            println!("{}", format!("✓ {} handed to {}", task_id, target).green());
        }
        HandoffOutcome::Queued {
            task_id,
            target,
            reason,
        } => {
            println!("{}", format!("⏸ {} queued for {}", task_id, target).yellow());
            println!("  {}", reason);
        }
        HandoffOutcome::Rejected {
            task_id,
            target,
            reason,
        } => {
            println!("{}", format!("✗ {} rejected: {}", task_id, target).red());
            println!("  {}", reason);
        }
    }
    Ok(())
}

async fn queued(client: DaemonClient) -> Result<()> {
    let queued = client.queued_handoffs().await?;
    if queued.is_empty() {
        println!("{}", "No queued handoffs".green());
        return Ok(());
    }
    for entry in queued {
        println!(
            "  {}  {} → {}  {}",
            entry.queued_at.format("%Y-%m-%d %H:%M:%S"),
            entry.request.source_agent,
            entry.request.target_agent.bold(),
            entry.reason.dimmed()
        );
    }
    Ok(())
}

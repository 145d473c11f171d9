// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Phase, crew and quality-gate commands
//!
//! Commands: current, set, validate, crew, facts, fact

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use crewplane_core::domain::validation::{ValidationReport, ValidationStatus};

use super::connect;
use crate::daemon::DaemonClient;

#[derive(Subcommand)]
pub enum PhaseCommand {
    /// Show the current phase and its crew
    Current,

    /// Move the project to another phase
    Set {
        /// Target phase (planning, architecture, development, testing, deployment, maintenance)
        #[arg(value_name = "PHASE")]
        phase: String,

        /// Skip the quality gate
        #[arg(short, long)]
        force: bool,
    },

    /// Dry-run the quality gate for a transition
    Validate {
        #[arg(value_name = "PHASE")]
        phase: String,
    },

    /// Show reported project facts
    Facts,

    /// Report a project fact read by the quality gates
    Fact {
        /// Fact key (e.g. test_coverage)
        #[arg(value_name = "KEY")]
        key: String,

        /// JSON value (e.g. 91, true)
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

pub async fn handle_command(command: PhaseCommand, host: &str, port: u16) -> Result<()> {
    let Some(client) = connect(host, port).await? else {
        return Ok(());
    };

    match command {
        PhaseCommand::Current => current(client).await,
        PhaseCommand::Set { phase, force } => set(client, &phase, force).await,
        PhaseCommand::Validate { phase } => validate(client, &phase).await,
        PhaseCommand::Facts => facts(client).await,
        PhaseCommand::Fact { key, value } => fact(client, &key, &value).await,
    }
}

async fn current(client: DaemonClient) -> Result<()> {
    let crew = client.crew().await?;
    println!("{} {}", "Phase:".bold(), crew.phase.to_string().cyan());
    println!("{} {}", "Gatekeeper:".bold(), crew.gatekeeper);
    println!("{}", "Active crew:".bold());
    for agent in crew.agents {
        println!("  - {}", agent);
    }
    Ok(())
}

async fn set(client: DaemonClient, phase: &str, force: bool) -> Result<()> {
    match client.set_phase(phase, force).await {
        Ok(change) => {
            let suffix = if change.forced { " (forced)" } else { "" };
            println!(
                "{}",
                format!(
                    "✓ Phase changed: {} → {}{}",
                    change.previous_phase, change.phase, suffix
                )
                .green()
            );
            if let Some(report) = &change.validation {
                print_report(report);
            }
            println!("  Active crew: {}", join(&change.active_agents));
            Ok(())
        }
        Err(e) => {
            println!("{}", format!("✗ {}", e).red());
            // Re-run the dry-run so the user sees which checks blocked it.
            if let Ok(report) = client.validate_transition(phase).await {
                print_report(&report);
            }
            Err(e)
        }
    }
}

async fn validate(client: DaemonClient, phase: &str) -> Result<()> {
    let report = client.validate_transition(phase).await?;
    print_report(&report);
    Ok(())
}

async fn facts(client: DaemonClient) -> Result<()> {
    let state = client.facts().await?;
    if state.facts.is_empty() {
        println!("{}", "No project facts reported".yellow());
        return Ok(());
    }
    for (key, value) in state.facts {
        println!("  {:<28} {}", key.bold(), value);
    }
    Ok(())
}

async fn fact(client: DaemonClient, key: &str, value: &str) -> Result<()> {
    // Bare words are taken as strings.
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::from(value));
    client.record_fact(key, value).await?;
    println!("{}", format!("✓ Recorded {}", key).green());
    Ok(())
}

fn print_report(report: &ValidationReport) {
    println!(
        "{} {} [{}]",
        "Quality gate".bold(),
        report.transition,
        format_status(report.overall_status)
    );
    for check in &report.checks {
        println!(
            "  {:<28} {:<8} {}",
            check.check_name,
            format_status(check.status),
            check.details.dimmed()
        );
    }
}

fn format_status(status: ValidationStatus) -> colored::ColoredString {
    match status {
        ValidationStatus::Passed => "passed".green(),
        ValidationStatus::Warning => "warning".yellow(),
        ValidationStatus::Failed => "failed".red(),
        ValidationStatus::Pending => "pending".normal(),
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

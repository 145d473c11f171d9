// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # crewplane CLI
//!
//! The `crewplane` binary runs the control plane daemon and talks to it.
//!
//! ## Commands
//!
//! - `crewplane daemon start|stop|status` - Manage daemon lifecycle
//! - `crewplane agent list|status|execute|watch` - Registry and agent calls
//! - `crewplane phase current|set|validate|facts|fact` - Phases and quality gates
//! - `crewplane crew` - Current phase and its crew
//! - `crewplane task plan|status|handoffs` - Task planning
//! - `crewplane handoff send|queued` - Task handoffs
//! - `crewplane workflow start|status` - Predefined workflows
//! - `crewplane event publish|subscribe` - Topic events
//! - `crewplane config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use crewplane::commands::{
    self, AgentCommand, ConfigCommand, DaemonCommand, EventCommand, HandoffCommand, PhaseCommand,
    TaskCommand, WorkflowCommand,
};
use crewplane::daemon;
use crewplane_core::domain::node_config::{ControlPlaneConfigManifest, LogFormat};

const DEFAULT_PORT: u16 = 8000;

/// crewplane - control plane for a fleet of specialist agents
#[derive(Parser)]
#[command(name = "crewplane")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Run the control plane daemon in the foreground
    #[arg(long, global = true)]
    daemon: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "CREWPLANE_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP API port (default: 8000, or the configured port for the daemon)
    #[arg(long, global = true, env = "CREWPLANE_PORT")]
    port: Option<u16>,

    /// HTTP API host (default: 127.0.0.1)
    #[arg(long, global = true, env = "CREWPLANE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Log level (trace, debug, info, warn, error); the daemon defaults to
    /// the configured level
    #[arg(long, global = true, env = "CREWPLANE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage daemon lifecycle
    #[command(name = "daemon")]
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },

    /// Registered agents
    #[command(name = "agent")]
    Agent {
        #[command(subcommand)]
        command: AgentCommand,
    },

    /// Project phase and quality gates
    #[command(name = "phase")]
    Phase {
        #[command(subcommand)]
        command: PhaseCommand,
    },

    /// Show the current phase and its crew
    #[command(name = "crew")]
    Crew,

    /// Task planning
    #[command(name = "task")]
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Task handoffs between agents
    #[command(name = "handoff")]
    Handoff {
        #[command(subcommand)]
        command: HandoffCommand,
    },

    /// Predefined multi-agent workflows
    #[command(name = "workflow")]
    Workflow {
        #[command(subcommand)]
        command: WorkflowCommand,
    },

    /// Topic events
    #[command(name = "event")]
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.daemon {
        // Logging is not up yet; a bad file is reported by start_daemon.
        let logging = ControlPlaneConfigManifest::load_or_default(cli.config.clone())
            .map(|c| c.spec.observability.logging)
            .unwrap_or_default();
        let level = cli.log_level.as_deref().unwrap_or(&logging.level);
        init_logging(level, logging.format)?;

        info!("Starting crewplane control plane in daemon mode");
        return daemon::start_daemon(cli.config, cli.port).await;
    }

    init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
    let port = cli.port.unwrap_or(DEFAULT_PORT);

    match cli.command {
        Some(Commands::Daemon { command }) => {
            commands::daemon::handle_command(command, cli.config, &cli.host, port).await
        }
        Some(Commands::Agent { command }) => {
            commands::agent::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Phase { command }) => {
            commands::phase::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Crew) => {
            commands::phase::handle_command(PhaseCommand::Current, &cli.host, port).await
        }
        Some(Commands::Task { command }) => {
            commands::task::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Handoff { command }) => {
            commands::handoff::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Workflow { command }) => {
            commands::workflow::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Event { command }) => {
            commands::event::handle_command(command, &cli.host, port).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over `level`.
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }

    Ok(())
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use crewplane_core::domain::node_config::{ControlPlaneConfigManifest, StorageBackendKind};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./crewplane-config.yaml)
        #[arg(short, long, default_value = "./crewplane-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths),
        ConfigCommand::Validate { file } => validate(file.or(config_override)),
        ConfigCommand::Generate { output, examples } => generate(output, examples),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = ControlPlaneConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. CREWPLANE_CONFIG_PATH: {}",
            std::env::var("CREWPLANE_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./crewplane-config.yaml");
        println!("  4. ~/.crewplane/config.yaml");
        println!("  5. /etc/crewplane/config.yaml");
        println!();
    }

    let spec = &config.spec;
    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Network:".bold());
    println!("  Listen: {}:{}", spec.network.bind_address, spec.network.port);
    println!();

    println!("{}", "Storage:".bold());
    match spec.storage.backend {
        StorageBackendKind::InMemory => println!("  Backend: in-memory"),
        StorageBackendKind::Postgres => println!("  Backend: postgres"),
    }
    println!();

    println!("{}", "Liveness:".bold());
    println!("  Stale after: {:?}", spec.liveness.stale_after);
    println!("  Offline after: {:?}", spec.liveness.offline_after);
    println!("  Sweep every: {:?}", spec.liveness.sweep_interval);
    println!();

    println!("{}", "Event bus:".bold());
    println!("  Dedup window: {:?}", spec.event_bus.dedup_ttl);
    println!("  Purge every: {:?}", spec.event_bus.purge_interval);
    println!("  Circuit opens after: {} failures", spec.event_bus.failure_threshold);
    println!("  ACL default: {:?}", spec.event_bus.acl.default_policy);
    for (pattern, publishers) in &spec.event_bus.acl.topics {
        println!("    {} ← {}", pattern, publishers.join(", "));
    }
    println!();

    println!("{}", "Agents:".bold());
    for agent in &spec.agents {
        println!("  {:<22} {}", agent.role.to_string().bold(), agent.url);
    }
    if !spec.crews.is_empty() {
        println!();
        println!("{}", "Crew overrides:".bold());
        for crew in &spec.crews {
            println!("  {} (gatekeeper: {})", crew.phase, crew.gatekeeper);
        }
    }

    Ok(())
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = ControlPlaneConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

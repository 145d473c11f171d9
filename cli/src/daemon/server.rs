// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Daemon HTTP server

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crewplane_core::application::event_gateway::run_purger;
use crewplane_core::application::registry::run_sweeper;
use crewplane_core::domain::node_config::ControlPlaneConfigManifest;

use super::api::build_router;
use super::state::AppState;
use super::{remove_pid_file, write_pid_file};

/// Run the control plane in the foreground until SIGINT/SIGTERM.
///
/// `port` overrides `spec.network.port` when given.
pub async fn start_daemon(config_path: Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut config = ControlPlaneConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    if let Some(port) = port {
        config.spec.network.port = port;
    }
    config.validate().context("Configuration validation failed")?;

    let pid = std::process::id();
    write_pid_file(pid)?;
    let _guard = PidFileGuard;

    info!(pid, name = %config.metadata.name, "crewplane daemon starting");

    let spec = &config.spec;
    if spec.observability.metrics.enabled {
        let addr = SocketAddr::new(
            spec.network
                .bind_address
                .parse()
                .context("Invalid spec.network.bind_address")?,
            spec.observability.metrics.port,
        );
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!("Prometheus metrics on {}", addr);
    }

    let state = AppState::from_spec(spec).await?;

    let cancel = CancellationToken::new();
    let sweeper = tokio::spawn(run_sweeper(
        state.registry.clone(),
        spec.liveness.sweep_interval,
        cancel.clone(),
    ));
    let purger = tokio::spawn(run_purger(
        state.events.clone(),
        spec.event_bus.purge_interval,
        cancel.clone(),
    ));

    let app = build_router(state);
    let addr = format!("{}:{}", spec.network.bind_address, spec.network.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Daemon listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed");

    cancel.cancel();
    if let Err(e) = sweeper.await {
        error!("Liveness sweeper ended abnormally: {}", e);
    }
    if let Err(e) = purger.await {
        error!("Event bus purger ended abnormally: {}", e);
    }
    info!("Daemon shutting down");

    served
}

struct PidFileGuard;

impl Drop for PidFileGuard {
    fn drop(&mut self) {
        let _ = remove_pid_file();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

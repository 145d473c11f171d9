// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Service wiring for the daemon.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crewplane_core::application::{
    AgentDirectory, AgentRegistry, EventGateway, QualityGateService, StandardAgentRegistry,
};
use crewplane_core::domain::node_config::ControlPlaneSpec;
use crewplane_core::domain::repository::{StorageBackend, TaskRepository};
use crewplane_core::infrastructure::agent_client::{AgentClient, HttpAgentClient};
use crewplane_core::infrastructure::db::Database;
use crewplane_core::infrastructure::event_bus::EventBus;
use crewplane_core::infrastructure::repositories::RepositorySet;
use crewplane_swarm::application::{HandoffCoordinator, SwarmManager, TaskService, WorkflowService};
use crewplane_swarm::KeywordClassifier;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn AgentRegistry>,
    pub events: Arc<EventGateway>,
    pub gates: Arc<QualityGateService>,
    pub swarm: Arc<SwarmManager>,
    pub handoffs: Arc<HandoffCoordinator>,
    pub tasks: Arc<TaskService>,
    pub workflows: Arc<WorkflowService>,
    pub directory: Arc<AgentDirectory>,
    pub agent_client: Arc<dyn AgentClient>,
    pub task_store: Arc<dyn TaskRepository>,
    pub storage_backend: &'static str,
    pub started_at: Instant,
}

impl AppState {
    /// Connect the configured store and wire every service.
    pub async fn from_spec(spec: &ControlPlaneSpec) -> Result<Self> {
        let (repos, backend) = match spec.storage.to_backend()? {
            StorageBackend::InMemory => (RepositorySet::in_memory(), "in-memory"),
            StorageBackend::PostgreSQL(pg) => {
                let db = Database::new(&pg.connection_string)
                    .await
                    .context("Failed to open control plane store")?;
                db.ensure_schema().await?;
                (RepositorySet::postgres(db.get_pool().clone()), "postgres")
            }
        };
        info!(backend, "Control plane store ready");

        let client = Arc::new(HttpAgentClient::new(
            spec.dispatch.request_timeout,
            spec.dispatch.execute_timeout,
        ));
        Self::build(repos, backend, spec, client)
    }

    pub fn build(
        repos: RepositorySet,
        storage_backend: &'static str,
        spec: &ControlPlaneSpec,
        agent_client: Arc<dyn AgentClient>,
    ) -> Result<Self> {
        let event_bus = EventBus::new(spec.event_bus.channel_capacity);

        let registry: Arc<dyn AgentRegistry> = Arc::new(StandardAgentRegistry::new(
            repos.agents.clone(),
            event_bus.clone(),
            spec.liveness.thresholds(),
        ));
        let events = Arc::new(EventGateway::new(
            event_bus.clone(),
            repos.dedup.clone(),
            repos.publisher_health.clone(),
            spec.event_bus.clone(),
        ));
        let gates = Arc::new(QualityGateService::with_default_checks());
        let catalog = crewplane_core::domain::crew::CrewCatalog::default()
            .with_overrides(spec.crews.iter().cloned());
        let swarm = Arc::new(
            SwarmManager::new(
                catalog,
                gates.clone(),
                Arc::new(KeywordClassifier::default()),
                event_bus.clone(),
            )
            .context("Crew catalog has no planning crew")?,
        );
        let directory = Arc::new(AgentDirectory::new(&spec.agents, registry.clone()));
        let handoffs = Arc::new(HandoffCoordinator::new(
            swarm.clone(),
            directory.clone(),
            agent_client.clone(),
            repos.handoffs.clone(),
            event_bus.clone(),
            spec.dispatch.max_queued_handoffs,
        ));
        let tasks = Arc::new(TaskService::new(
            repos.tasks.clone(),
            swarm.clone(),
            directory.clone(),
            agent_client.clone(),
            event_bus.clone(),
        ));
        let workflows = Arc::new(WorkflowService::new(repos.workflows.clone(), event_bus));

        Ok(Self {
            registry,
            events,
            gates,
            swarm,
            handoffs,
            tasks,
            workflows,
            directory,
            agent_client,
            task_store: repos.tasks,
            storage_backend,
            started_at: Instant::now(),
        })
    }
}

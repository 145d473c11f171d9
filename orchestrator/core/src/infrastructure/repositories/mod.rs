// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve control-plane state
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! Shared-store implementations, required when more than one control plane
//! instance runs:
//! - **PostgresAgentRepository** - agent registry
//! - **PostgresTaskRepository** - task records
//! - **PostgresHandoffLogRepository** - per-task handoff history
//! - **PostgresEventStateStore** - event dedup window and publisher circuit breakers
//! - **PostgresWorkflowRepository** - started workflows
//!
//! ## In-Memory Repositories
//!
//! Process-local implementations for development and tests.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo(database_url: &str) -> anyhow::Result<()> {
//! use crewplane_core::infrastructure::db::Database;
//! use crewplane_core::infrastructure::repositories::RepositorySet;
//!
//! let db = Database::new(database_url).await?;
//! db.ensure_schema().await?;
//! let repos = RepositorySet::postgres(db.get_pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod postgres_agent;
pub mod postgres_event_state;
pub mod postgres_handoff;
pub mod postgres_task;
pub mod postgres_workflow;

pub use postgres_agent::PostgresAgentRepository;
pub use postgres_event_state::PostgresEventStateStore;
pub use postgres_handoff::PostgresHandoffLogRepository;
pub use postgres_task::PostgresTaskRepository;
pub use postgres_workflow::PostgresWorkflowRepository;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::agent::{AgentDescriptor, AgentId};
use crate::domain::events::PublisherHealth;
use crate::domain::handoff::HandoffLogEntry;
use crate::domain::repository::{
    AgentRepository, DedupStore, HandoffLogRepository, PublisherHealthStore, RepositoryError,
    TaskRepository, WorkflowRepository,
};
use crate::domain::task::{TaskId, TaskRecord};
use crate::domain::workflow::WorkflowRecord;

/// One handle per repository trait, built for the configured backend.
#[derive(Clone)]
pub struct RepositorySet {
    pub agents: Arc<dyn AgentRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub handoffs: Arc<dyn HandoffLogRepository>,
    pub dedup: Arc<dyn DedupStore>,
    pub publisher_health: Arc<dyn PublisherHealthStore>,
    pub workflows: Arc<dyn WorkflowRepository>,
}

impl RepositorySet {
    pub fn in_memory() -> Self {
        Self {
            agents: Arc::new(InMemoryAgentRepository::new()),
            tasks: Arc::new(InMemoryTaskRepository::new()),
            handoffs: Arc::new(InMemoryHandoffLogRepository::new()),
            dedup: Arc::new(InMemoryDedupStore::new()),
            publisher_health: Arc::new(InMemoryPublisherHealthStore::new()),
            workflows: Arc::new(InMemoryWorkflowRepository::new()),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let event_state = Arc::new(PostgresEventStateStore::new(pool.clone()));
        Self {
            agents: Arc::new(PostgresAgentRepository::new(pool.clone())),
            tasks: Arc::new(PostgresTaskRepository::new(pool.clone())),
            handoffs: Arc::new(PostgresHandoffLogRepository::new(pool.clone())),
            dedup: event_state.clone(),
            publisher_health: event_state,
            workflows: Arc::new(PostgresWorkflowRepository::new(pool)),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryAgentRepository {
    agents: Arc<RwLock<HashMap<AgentId, AgentDescriptor>>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn save(&self, agent: &AgentDescriptor) -> Result<AgentId, RepositoryError> {
        let mut agents = self.agents.write();
        let mut stored = agent.clone();
        if let Some(existing) = agents.values().find(|a| a.dedup_key == agent.dedup_key) {
            stored.id = existing.id;
            stored.registered_at = existing.registered_at;
        }
        let id = stored.id;
        agents.insert(id, stored);
        Ok(id)
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<AgentDescriptor>, RepositoryError> {
        Ok(self.agents.read().get(&id).cloned())
    }

    async fn find_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<AgentDescriptor>, RepositoryError> {
        Ok(self
            .agents
            .read()
            .values()
            .find(|a| a.dedup_key == dedup_key)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<AgentDescriptor>, RepositoryError> {
        let mut agents: Vec<AgentDescriptor> = self.agents.read().values().cloned().collect();
        agents.sort_by(|a, b| a.registered_at.cmp(&b.registered_at));
        Ok(agents)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<TaskId, TaskRecord>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn save(&self, task: &TaskRecord) -> Result<(), RepositoryError> {
        self.tasks.write().insert(task.task_id.clone(), task.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<TaskRecord>, RepositoryError> {
        Ok(self.tasks.read().get(id).cloned())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryWorkflowRepository {
    workflows: Arc<RwLock<HashMap<String, WorkflowRecord>>>,
}

impl InMemoryWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError> {
        self.workflows
            .write()
            .insert(workflow.workflow_id.clone(), workflow.clone());
        Ok(())
    }

    async fn find_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>, RepositoryError> {
        Ok(self.workflows.read().get(workflow_id).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryHandoffLogRepository {
    logs: Arc<DashMap<String, Vec<HandoffLogEntry>>>,
}

impl InMemoryHandoffLogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HandoffLogRepository for InMemoryHandoffLogRepository {
    async fn append(&self, task_id: &str, entry: &HandoffLogEntry) -> Result<(), RepositoryError> {
        self.logs
            .entry(task_id.to_string())
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn history(&self, task_id: &str) -> Result<Vec<HandoffLogEntry>, RepositoryError> {
        Ok(self
            .logs
            .get(task_id)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }
}

/// Event id → expiry of its dedup claim.
#[derive(Clone, Default)]
pub struct InMemoryDedupStore {
    seen: Arc<DashMap<String, DateTime<Utc>>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for InMemoryDedupStore {
    async fn first_seen(
        &self,
        event_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // The entry guard holds the shard lock, so check-and-claim is atomic.
        let mut entry = self.seen.entry(event_id.to_string()).or_insert(now);
        if *entry > now {
            return Ok(false);
        }
        *entry = now + ttl;
        Ok(true)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let before = self.seen.len();
        self.seen.retain(|_, expires_at| *expires_at > now);
        Ok(before.saturating_sub(self.seen.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryPublisherHealthStore {
    publishers: Arc<DashMap<String, PublisherHealth>>,
}

impl InMemoryPublisherHealthStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PublisherHealthStore for InMemoryPublisherHealthStore {
    async fn record(
        &self,
        publisher_id: &str,
        success: bool,
        failure_threshold: u32,
    ) -> Result<PublisherHealth, RepositoryError> {
        let now = Utc::now();
        let mut entry = self
            .publishers
            .entry(publisher_id.to_string())
            .or_insert_with(|| PublisherHealth::new(publisher_id, now));
        entry.apply(success, failure_threshold, now);
        Ok(entry.clone())
    }

    async fn get(&self, publisher_id: &str) -> Result<Option<PublisherHealth>, RepositoryError> {
        Ok(self.publishers.get(publisher_id).map(|h| h.clone()))
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for the control plane's state, one trait per
//! aggregate, implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | State | Implementations |
//! |-------|-------|----------------|
//! | `AgentRepository` | `AgentDescriptor` | `InMemoryAgentRepository`, `PostgresAgentRepository` |
//! | `TaskRepository` | `TaskRecord` | `InMemoryTaskRepository`, `PostgresTaskRepository` |
//! | `HandoffLogRepository` | per-task handoff log | `InMemoryHandoffLogRepository`, `PostgresHandoffLogRepository` |
//! | `DedupStore` | event-id dedup window | `InMemoryDedupStore`, `PostgresEventStateStore` |
//! | `PublisherHealthStore` | `PublisherHealth` | `InMemoryPublisherHealthStore`, `PostgresEventStateStore` |
//! | `WorkflowRepository` | `WorkflowRecord` | `InMemoryWorkflowRepository`, `PostgresWorkflowRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! Implementations are selected at daemon startup from `spec.storage` in the
//! config manifest. In-memory storage is for development and tests; a
//! horizontally scaled control plane must use PostgreSQL so that dedup and
//! circuit-breaker state is shared across instances.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::agent::{AgentDescriptor, AgentId};
use crate::domain::events::PublisherHealth;
use crate::domain::handoff::HandoffLogEntry;
use crate::domain::task::{TaskId, TaskRecord};
use crate::domain::workflow::WorkflowRecord;

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Upsert keyed on `dedup_key`. Returns the id stored for that key,
    /// which differs from `agent.id` when another writer created the row
    /// first; `registered_at` of an existing row is kept.
    async fn save(&self, agent: &AgentDescriptor) -> Result<AgentId, RepositoryError>;

    async fn find_by_id(&self, id: AgentId) -> Result<Option<AgentDescriptor>, RepositoryError>;

    async fn find_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<AgentDescriptor>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<AgentDescriptor>, RepositoryError>;
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn save(&self, task: &TaskRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<TaskRecord>, RepositoryError>;

    /// Cheap round-trip used by the health report.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>, RepositoryError>;
}

/// Append-only, per-task ordered handoff history.
#[async_trait]
pub trait HandoffLogRepository: Send + Sync {
    async fn append(&self, task_id: &str, entry: &HandoffLogEntry) -> Result<(), RepositoryError>;

    /// Entries in append order.
    async fn history(&self, task_id: &str) -> Result<Vec<HandoffLogEntry>, RepositoryError>;
}

/// Remembers event ids for a bounded window.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Atomically claim `event_id`. Returns `true` when the id was not seen
    /// within `ttl` before `now` (the caller should deliver), `false` for a
    /// duplicate. An expired claim is renewed and counts as first sight.
    async fn first_seen(
        &self,
        event_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Forget claims that expired at or before `now`. Returns how many were
    /// dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Per-publisher circuit-breaker counters.
#[async_trait]
pub trait PublisherHealthStore: Send + Sync {
    /// Apply one health report and return the resulting state.
    async fn record(
        &self,
        publisher_id: &str,
        success: bool,
        failure_threshold: u32,
    ) -> Result<PublisherHealth, RepositoryError>;

    async fn get(&self, publisher_id: &str) -> Result<Option<PublisherHealth>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

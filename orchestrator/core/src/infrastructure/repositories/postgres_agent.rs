// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Agent Repository
//!
//! `AgentRepository` backed by the `agents` table. The upsert conflicts on
//! the UNIQUE `dedup_key`, so two control-plane instances racing on the same
//! registration end up with one row and both learn its id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::agent::{AgentDescriptor, AgentId, AgentStatus};
use crate::domain::repository::{AgentRepository, RepositoryError};

pub struct PostgresAgentRepository {
    pool: PgPool,
}

impl PostgresAgentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_AGENT: &str = r#"
    SELECT
        id, dedup_key, name, role, version, capabilities, topics, health_url,
        status, load, reported_status, registered_at, last_heartbeat_at
    FROM agents
"#;

fn row_to_descriptor(row: &PgRow) -> Result<AgentDescriptor, RepositoryError> {
    let id: uuid::Uuid = row.get("id");
    let capabilities: serde_json::Value = row.get("capabilities");
    let topics: serde_json::Value = row.get("topics");
    let status_str: String = row.get("status");
    let registered_at: DateTime<Utc> = row.get("registered_at");
    let last_heartbeat_at: DateTime<Utc> = row.get("last_heartbeat_at");

    let status = AgentStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown agent status '{}'", status_str))
    })?;

    Ok(AgentDescriptor {
        id: AgentId(id),
        name: row.get("name"),
        role: row.get("role"),
        version: row.get("version"),
        capabilities: serde_json::from_value(capabilities)?,
        topics: serde_json::from_value(topics)?,
        health_url: row.get("health_url"),
        dedup_key: row.get("dedup_key"),
        status,
        load: row.get("load"),
        reported_status: row.get("reported_status"),
        registered_at,
        last_heartbeat_at,
    })
}

#[async_trait]
impl AgentRepository for PostgresAgentRepository {
    async fn save(&self, agent: &AgentDescriptor) -> Result<AgentId, RepositoryError> {
        let capabilities = serde_json::to_value(&agent.capabilities)?;
        let topics = serde_json::to_value(&agent.topics)?;

        let row = sqlx::query(
            r#"
            INSERT INTO agents (
                id, dedup_key, name, role, version, capabilities, topics, health_url,
                status, load, reported_status, registered_at, last_heartbeat_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (dedup_key) DO UPDATE SET
                name = EXCLUDED.name,
                role = EXCLUDED.role,
                version = EXCLUDED.version,
                capabilities = EXCLUDED.capabilities,
                topics = EXCLUDED.topics,
                health_url = EXCLUDED.health_url,
                status = EXCLUDED.status,
                load = EXCLUDED.load,
                reported_status = EXCLUDED.reported_status,
                last_heartbeat_at = EXCLUDED.last_heartbeat_at
            RETURNING id
            "#,
        )
        .bind(agent.id.0)
        .bind(&agent.dedup_key)
        .bind(&agent.name)
        .bind(&agent.role)
        .bind(&agent.version)
        .bind(capabilities)
        .bind(topics)
        .bind(&agent.health_url)
        .bind(agent.status.as_str())
        .bind(agent.load)
        .bind(&agent.reported_status)
        .bind(agent.registered_at)
        .bind(agent.last_heartbeat_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save agent: {}", e)))?;

        Ok(AgentId(row.get("id")))
    }

    async fn find_by_id(&self, id: AgentId) -> Result<Option<AgentDescriptor>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_AGENT))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_descriptor).transpose()
    }

    async fn find_by_dedup_key(
        &self,
        dedup_key: &str,
    ) -> Result<Option<AgentDescriptor>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE dedup_key = $1", SELECT_AGENT))
            .bind(dedup_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_descriptor).transpose()
    }

    async fn list_all(&self) -> Result<Vec<AgentDescriptor>, RepositoryError> {
        let rows = sqlx::query(&format!("{} ORDER BY registered_at", SELECT_AGENT))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_descriptor).collect()
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, WorkflowRepository};
use crate::domain::workflow::{WorkflowRecord, WorkflowStatus};

pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_workflow(row: &PgRow) -> Result<WorkflowRecord, RepositoryError> {
    let type_str: String = row.get("workflow_type");
    let workflow_type = type_str
        .parse()
        .map_err(|_| RepositoryError::Serialization(format!("Unknown workflow type '{}'", type_str)))?;
    let status_str: String = row.get("status");
    let status = WorkflowStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown workflow status '{}'", status_str))
    })?;
    let agents: serde_json::Value = row.get("agents");

    Ok(WorkflowRecord {
        workflow_id: row.get("workflow_id"),
        workflow_type,
        description: row.get("description"),
        agents: serde_json::from_value(agents)?,
        status,
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn save(&self, workflow: &WorkflowRecord) -> Result<(), RepositoryError> {
        let agents = serde_json::to_value(&workflow.agents)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (workflow_id, workflow_type, description, agents, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (workflow_id) DO UPDATE SET
                status = EXCLUDED.status
            "#,
        )
        .bind(&workflow.workflow_id)
        .bind(workflow.workflow_type.as_str())
        .bind(&workflow.description)
        .bind(agents)
        .bind(workflow.status.as_str())
        .bind(workflow.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save workflow: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT workflow_id, workflow_type, description, agents, status, created_at
            FROM workflows
            WHERE workflow_id = $1
            "#,
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_workflow).transpose()
    }
}

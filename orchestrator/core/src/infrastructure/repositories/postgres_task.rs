// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::repository::{RepositoryError, TaskRepository};
use crate::domain::task::{TaskId, TaskRecord, TaskStatus};

pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: &PgRow) -> Result<TaskRecord, RepositoryError> {
    let status_str: String = row.get("status");
    let status = TaskStatus::parse(&status_str).ok_or_else(|| {
        RepositoryError::Serialization(format!("Unknown task status '{}'", status_str))
    })?;

    Ok(TaskRecord {
        task_id: TaskId(row.get("task_id")),
        description: row.get("description"),
        context: row.get("context"),
        status,
        assigned_agent: row.get("assigned_agent"),
        plan: row.get("plan"),
        result: row.get("result"),
        error: row.get("error"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn save(&self, task: &TaskRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                task_id, description, context, status, assigned_agent,
                plan, result, error, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (task_id) DO UPDATE SET
                status = EXCLUDED.status,
                assigned_agent = EXCLUDED.assigned_agent,
                plan = EXCLUDED.plan,
                result = EXCLUDED.result,
                error = EXCLUDED.error,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(task.task_id.as_str())
        .bind(&task.description)
        .bind(&task.context)
        .bind(task.status.as_str())
        .bind(&task.assigned_agent)
        .bind(&task.plan)
        .bind(&task.result)
        .bind(&task.error)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to save task: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<TaskRecord>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                task_id, description, context, status, assigned_agent,
                plan, result, error, created_at, updated_at
            FROM tasks
            WHERE task_id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_task).transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

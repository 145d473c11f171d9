// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::handoff::HandoffLogEntry;
use crate::domain::repository::{HandoffLogRepository, RepositoryError};

/// Handoff history in `handoff_log`; the BIGSERIAL `seq` column gives the
/// append order.
pub struct PostgresHandoffLogRepository {
    pool: PgPool,
}

impl PostgresHandoffLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HandoffLogRepository for PostgresHandoffLogRepository {
    async fn append(&self, task_id: &str, entry: &HandoffLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO handoff_log (task_id, source, target, logged_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(task_id)
        .bind(&entry.source)
        .bind(&entry.target)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to append handoff: {}", e)))?;

        Ok(())
    }

    async fn history(&self, task_id: &str) -> Result<Vec<HandoffLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT source, target, logged_at FROM handoff_log WHERE task_id = $1 ORDER BY seq",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| HandoffLogEntry {
                source: row.get("source"),
                target: row.get("target"),
                timestamp: row.get("logged_at"),
            })
            .collect())
    }
}

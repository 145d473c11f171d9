// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Event Bus State
//!
//! Dedup claims and publisher circuit breakers in shared tables, so every
//! control-plane instance agrees on which event ids were delivered and which
//! publishers are paused. Both operations are a single statement, which makes
//! them atomic without explicit transactions.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::events::PublisherHealth;
use crate::domain::repository::{DedupStore, PublisherHealthStore, RepositoryError};

pub struct PostgresEventStateStore {
    pool: PgPool,
}

impl PostgresEventStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DedupStore for PostgresEventStateStore {
    async fn first_seen(
        &self,
        event_id: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        // Inserts a fresh claim or renews an expired one; a live claim makes
        // the WHERE fail and nothing is returned.
        let claimed = sqlx::query(
            r#"
            INSERT INTO event_dedup (event_id, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO UPDATE SET expires_at = EXCLUDED.expires_at
            WHERE event_dedup.expires_at <= $3
            RETURNING event_id
            "#,
        )
        .bind(event_id)
        .bind(now + ttl)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(claimed.is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM event_dedup WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PublisherHealthStore for PostgresEventStateStore {
    async fn record(
        &self,
        publisher_id: &str,
        success: bool,
        failure_threshold: u32,
    ) -> Result<PublisherHealth, RepositoryError> {
        let threshold = i32::try_from(failure_threshold).unwrap_or(i32::MAX);
        let row = sqlx::query(
            r#"
            INSERT INTO publisher_health (publisher_id, consecutive_failures, paused, updated_at)
            VALUES ($1, CASE WHEN $2 THEN 0 ELSE 1 END, (NOT $2) AND 1 >= $3, NOW())
            ON CONFLICT (publisher_id) DO UPDATE SET
                consecutive_failures = CASE WHEN $2 THEN 0
                    ELSE publisher_health.consecutive_failures + 1 END,
                paused = CASE WHEN $2 THEN FALSE
                    ELSE publisher_health.consecutive_failures + 1 >= $3 END,
                updated_at = NOW()
            RETURNING publisher_id, consecutive_failures, paused, updated_at
            "#,
        )
        .bind(publisher_id)
        .bind(success)
        .bind(threshold)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_health(&row))
    }

    async fn get(&self, publisher_id: &str) -> Result<Option<PublisherHealth>, RepositoryError> {
        let row = sqlx::query(
            "SELECT publisher_id, consecutive_failures, paused, updated_at FROM publisher_health WHERE publisher_id = $1",
        )
        .bind(publisher_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_health))
    }
}

fn row_to_health(row: &sqlx::postgres::PgRow) -> PublisherHealth {
    let failures: i32 = row.get("consecutive_failures");
    PublisherHealth {
        publisher_id: row.get("publisher_id"),
        consecutive_failures: u32::try_from(failures).unwrap_or(0),
        paused: row.get("paused"),
        updated_at: row.get("updated_at"),
    }
}

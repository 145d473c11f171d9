// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// `task_<YYYYmmdd_HHMMSS>_<8 hex>`. The timestamp keeps ids sortable by
    /// submission time; the suffix keeps ids submitted in the same second apart.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("task_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Planning,
    Delegated,
    Completed,
    Error,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Planning => "planning",
            TaskStatus::Delegated => "delegated",
            TaskStatus::Completed => "completed",
            TaskStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(TaskStatus::Planning),
            "delegated" => Some(TaskStatus::Delegated),
            "completed" => Some(TaskStatus::Completed),
            "error" => Some(TaskStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error)
    }

    fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Planning, TaskStatus::Delegated)
                | (TaskStatus::Planning, TaskStatus::Error)
                | (TaskStatus::Delegated, TaskStatus::Completed)
                | (TaskStatus::Delegated, TaskStatus::Error)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task {task_id} cannot move from {from} to {to}")]
    IllegalTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// A submitted task and what the control plane knows about its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub description: String,
    #[serde(default)]
    pub context: serde_json::Value,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(description: impl Into<String>, context: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            task_id: TaskId::generate(now),
            description: description.into(),
            context,
            status: TaskStatus::Planning,
            assigned_agent: None,
            plan: None,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, next: TaskStatus, now: DateTime<Utc>) -> Result<(), TaskError> {
        if !self.status.can_transition_to(next) {
            return Err(TaskError::IllegalTransition {
                task_id: self.task_id.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    pub fn delegate(
        &mut self,
        agent: impl Into<String>,
        plan: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), TaskError> {
        self.transition(TaskStatus::Delegated, now)?;
        self.assigned_agent = Some(agent.into());
        self.plan = Some(plan);
        Ok(())
    }

    pub fn complete(&mut self, result: serde_json::Value, now: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Completed, now)?;
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> Result<(), TaskError> {
        self.transition(TaskStatus::Error, now)?;
        self.error = Some(error.into());
        Ok(())
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ControlPlaneError;

/// Body of `POST /handoff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffRequest {
    pub source_agent: String,
    pub target_agent: String,
    pub task_id: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub artifacts: Vec<serde_json::Value>,
}

impl HandoffRequest {
    pub fn validate(&self) -> Result<(), ControlPlaneError> {
        if self.source_agent.trim().is_empty() {
            return Err(ControlPlaneError::validation("source_agent", "must not be empty"));
        }
        if self.target_agent.trim().is_empty() {
            return Err(ControlPlaneError::validation("target_agent", "must not be empty"));
        }
        if self.task_id.trim().is_empty() {
            return Err(ControlPlaneError::validation("task_id", "must not be empty"));
        }
        Ok(())
    }

    /// Payload sent to the target agent's `POST /execute`.
    pub fn dispatch_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "task": format!("Continue task {} handed off by {}", self.task_id, self.source_agent),
            "task_id": self.task_id,
            "source_agent": self.source_agent,
            "context": self.context,
            "artifacts": self.artifacts,
        })
    }
}

/// Result of a handoff call.
///
/// `Queued` and `Rejected` are distinct: a queued target exists but is out of
/// the current crew (or offline); a rejected target is not a known role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HandoffOutcome {
    Accepted {
        task_id: String,
        target: String,
    },
    Queued {
        task_id: String,
        target: String,
        reason: String,
    },
    Rejected {
        task_id: String,
        target: String,
        reason: String,
    },
}

impl HandoffOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoffOutcome::Accepted { .. } => "accepted",
            HandoffOutcome::Queued { .. } => "queued",
            HandoffOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// One immutable entry of a task's handoff history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffLogEntry {
    pub source: String,
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

/// A handoff parked because its target was not routable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedHandoff {
    pub request: HandoffRequest,
    pub reason: String,
    pub queued_at: DateTime<Utc>,
}

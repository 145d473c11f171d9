// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::agent::{AgentId, AgentStatus};
use crate::domain::error::ControlPlaneError;
use crate::domain::phase::ProjectPhase;
use crate::domain::validation::ValidationStatus;

/// Registry changes, streamed by `GET /agents/watch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegistryEvent {
    AgentRegistered {
        agent_id: AgentId,
        name: String,
        role: String,
        dedup_key: String,
        registered_at: DateTime<Utc>,
    },
    AgentUpdated {
        agent_id: AgentId,
        name: String,
        role: String,
        updated_at: DateTime<Utc>,
    },
    AgentStatusChanged {
        agent_id: AgentId,
        name: String,
        from: AgentStatus,
        to: AgentStatus,
        changed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhaseEvent {
    PhaseActivated {
        from: ProjectPhase,
        to: ProjectPhase,
        forced: bool,
        /// `None` when validation was skipped (same phase or forced).
        gate_status: Option<ValidationStatus>,
        activated_at: DateTime<Utc>,
    },
    TransitionRejected {
        from: ProjectPhase,
        to: ProjectPhase,
        failed_checks: Vec<String>,
        rejected_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandoffEvent {
    HandoffAccepted {
        task_id: String,
        source: String,
        target: String,
        accepted_at: DateTime<Utc>,
    },
    HandoffQueued {
        task_id: String,
        source: String,
        target: String,
        queued_at: DateTime<Utc>,
    },
    HandoffRejected {
        task_id: String,
        source: String,
        target: String,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
    DispatchFailed {
        task_id: String,
        target: String,
        reason: String,
        failed_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskEvent {
    TaskPlanned {
        task_id: String,
        assigned_agents: Vec<String>,
        planned_at: DateTime<Utc>,
    },
    TaskDelegated {
        task_id: String,
        agent: String,
        delegated_at: DateTime<Utc>,
    },
    TaskFinished {
        task_id: String,
        status: String,
        finished_at: DateTime<Utc>,
    },
    WorkflowStarted {
        workflow_id: String,
        workflow_type: String,
        agents: Vec<String>,
        started_at: DateTime<Utc>,
    },
}

/// Body of `POST /events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    /// Caller-chosen id; a retry must reuse it so the bus can suppress the duplicate.
    pub id: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub publisher: String,
}

impl PublishRequest {
    pub fn validate(&self) -> Result<(), ControlPlaneError> {
        for (field, value) in [
            ("id", &self.id),
            ("topic", &self.topic),
            ("type", &self.event_type),
            ("publisher", &self.publisher),
        ] {
            if value.trim().is_empty() {
                return Err(ControlPlaneError::validation(field, "must not be empty"));
            }
        }
        Ok(())
    }

    pub fn into_envelope(self, published_at: DateTime<Utc>) -> EventEnvelope {
        EventEnvelope {
            id: self.id,
            topic: self.topic,
            event_type: self.event_type,
            payload: self.payload,
            publisher: self.publisher,
            published_at,
        }
    }
}

/// What subscribers of a topic receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub topic: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub publisher: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub event_id: String,
    /// `false` when the id was already delivered inside the dedup window.
    pub delivered: bool,
    pub subscribers: usize,
}

/// Circuit-breaker state of one publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherHealth {
    pub publisher_id: String,
    pub consecutive_failures: u32,
    pub paused: bool,
    pub updated_at: DateTime<Utc>,
}

impl PublisherHealth {
    pub fn new(publisher_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            consecutive_failures: 0,
            paused: false,
            updated_at: now,
        }
    }

    /// Apply one health report. A success closes the circuit and resets the
    /// counter; `failure_threshold` consecutive failures open it.
    pub fn apply(&mut self, success: bool, failure_threshold: u32, now: DateTime<Utc>) {
        if success {
            self.consecutive_failures = 0;
            self.paused = false;
        } else {
            self.consecutive_failures = self.consecutive_failures.saturating_add(1);
            if self.consecutive_failures >= failure_threshold {
                self.paused = true;
            }
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circuit_opens_at_threshold_and_closes_on_success() {
        let now = Utc::now();
        let mut health = PublisherHealth::new("coder", now);
        health.apply(false, 3, now);
        health.apply(false, 3, now);
        assert!(!health.paused);
        health.apply(false, 3, now);
        assert!(health.paused);
        assert_eq!(health.consecutive_failures, 3);

        health.apply(true, 3, now);
        assert!(!health.paused);
        assert_eq!(health.consecutive_failures, 0);
    }

    #[test]
    fn test_publish_request_uses_type_on_the_wire() {
        let req: PublishRequest = serde_json::from_value(serde_json::json!({
            "id": "evt-1",
            "topic": "agent.events",
            "type": "build.finished",
            "payload": {"ok": true},
            "publisher": "devops-engineer"
        }))
        .unwrap();
        assert_eq!(req.event_type, "build.finished");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_blank_publisher_is_rejected() {
        let req = PublishRequest {
            id: "evt-1".to_string(),
            topic: "agent.events".to_string(),
            event_type: "ping".to_string(),
            payload: serde_json::Value::Null,
            publisher: " ".to_string(),
        };
        match req.validate() {
            Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "publisher"),
            other => panic!("unexpected {:?}", other),
        }
    }
}

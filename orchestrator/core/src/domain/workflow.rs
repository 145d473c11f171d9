// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Predefined multi-agent workflows.
//!
//! A workflow is a named, fixed sequence of roles a piece of work passes
//! through. Starting one records it as `initiated`; walking the sequence is
//! left to the agents, which hand the work along with `POST /handoff`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::crew::AgentRole;
use crate::domain::error::ControlPlaneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    Feature,
    Bugfix,
    Refactor,
    SecurityAudit,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 4] = [
        WorkflowType::Feature,
        WorkflowType::Bugfix,
        WorkflowType::Refactor,
        WorkflowType::SecurityAudit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::Feature => "feature",
            WorkflowType::Bugfix => "bugfix",
            WorkflowType::Refactor => "refactor",
            WorkflowType::SecurityAudit => "security_audit",
        }
    }

    /// Roles the work visits, in order.
    pub fn agents(&self) -> &'static [AgentRole] {
        use AgentRole::*;
        match self {
            WorkflowType::Feature => &[
                ProjectStrategist,
                SystemArchitect,
                FrontendSpecialist,
                BackendSpecialist,
                DatabaseArchitect,
                QaEngineer,
                DevopsEngineer,
            ],
            WorkflowType::Bugfix => &[
                ProjectStrategist,
                QaEngineer,
                BackendSpecialist,
                FrontendSpecialist,
            ],
            WorkflowType::Refactor => &[
                SystemArchitect,
                BackendSpecialist,
                FrontendSpecialist,
                QaEngineer,
            ],
            WorkflowType::SecurityAudit => &[SecurityEngineer, BackendSpecialist, DatabaseArchitect],
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowType {
    type Err = ControlPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        WorkflowType::ALL
            .into_iter()
            .find(|w| w.as_str() == normalized)
            .ok_or_else(|| {
                ControlPlaneError::validation("workflow_type", format!("Unknown workflow: {}", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Initiated,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Initiated => "initiated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(WorkflowStatus::Initiated),
            _ => None,
        }
    }
}

/// Body of `POST /workflow/{workflow_type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRequest {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub description: String,
    pub agents: Vec<AgentRole>,
    pub status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
}

impl WorkflowRecord {
    /// `workflow_<type>_<YYYYmmdd_HHMMSS>_<8 hex>`.
    pub fn new(workflow_type: WorkflowType, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            workflow_id: format!(
                "workflow_{}_{}_{}",
                workflow_type,
                now.format("%Y%m%d_%H%M%S"),
                &suffix[..8]
            ),
            workflow_type,
            description: description.into(),
            agents: workflow_type.agents().to_vec(),
            status: WorkflowStatus::Initiated,
            created_at: now,
        }
    }
}

/// Response of `POST /workflow/{workflow_type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowReceipt {
    pub workflow_id: String,
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub agents: Vec<AgentRole>,
    pub status: WorkflowStatus,
}

impl From<&WorkflowRecord> for WorkflowReceipt {
    fn from(record: &WorkflowRecord) -> Self {
        Self {
            workflow_id: record.workflow_id.clone(),
            workflow_type: record.workflow_type,
            agents: record.agents.clone(),
            status: record.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_parse_leniently() {
        assert_eq!("security-audit".parse::<WorkflowType>().unwrap(), WorkflowType::SecurityAudit);
        assert_eq!(" Bugfix ".parse::<WorkflowType>().unwrap(), WorkflowType::Bugfix);
        assert!(matches!(
            "deploy".parse::<WorkflowType>(),
            Err(ControlPlaneError::Validation { .. })
        ));
    }

    #[test]
    fn test_feature_walks_the_whole_delivery_chain() {
        let agents = WorkflowType::Feature.agents();
        assert_eq!(agents.first(), Some(&AgentRole::ProjectStrategist));
        assert_eq!(agents.last(), Some(&AgentRole::DevopsEngineer));
        assert_eq!(agents.len(), 7);
    }

    #[test]
    fn test_record_id_names_the_type() {
        let record = WorkflowRecord::new(WorkflowType::Refactor, "split the monolith", Utc::now());
        assert!(record.workflow_id.starts_with("workflow_refactor_"));
        assert_eq!(record.status, WorkflowStatus::Initiated);

        let receipt = serde_json::to_value(WorkflowReceipt::from(&record)).unwrap();
        assert_eq!(receipt["type"], "refactor");
        assert_eq!(receipt["status"], "initiated");
        assert_eq!(receipt["agents"][0], "system_architect");
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};

use crewplane_core::domain::crew::{AgentRole, CrewConfig};
use crewplane_core::domain::phase::ProjectPhase;
use crewplane_core::domain::validation::ValidationReport;

/// Body of `GET /crew`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewSnapshot {
    pub phase: ProjectPhase,
    /// Primary then support agents, in crew order.
    pub agents: Vec<AgentRole>,
    pub gatekeeper: AgentRole,
}

impl From<&CrewConfig> for CrewSnapshot {
    fn from(crew: &CrewConfig) -> Self {
        let mut agents = crew.primary_agents.clone();
        for role in &crew.support_agents {
            if !agents.contains(role) {
                agents.push(*role);
            }
        }
        Self {
            phase: crew.phase,
            agents,
            gatekeeper: crew.gatekeeper,
        }
    }
}

/// Result of a successful phase change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub phase: ProjectPhase,
    pub previous_phase: ProjectPhase,
    pub active_agents: Vec<AgentRole>,
    pub gatekeeper: AgentRole,
    pub forced: bool,
    /// Present when the gate was evaluated; a `warning` report still proceeds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationReport>,
}

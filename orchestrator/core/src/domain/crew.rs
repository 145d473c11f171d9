// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Crews and Roles
//!
//! A crew is the static set of roles in scope for one [`ProjectPhase`]:
//! primary agents, support agents and the gatekeeper whose checks gate exit
//! from the phase. Crews are loaded once at startup and never mutated.
//!
//! The orchestrator role is outside every crew and always active.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ControlPlaneError;
use crate::domain::phase::ProjectPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    #[serde(rename = "broski_orchestrator")]
    Orchestrator,
    ProjectStrategist,
    FrontendSpecialist,
    BackendSpecialist,
    QaEngineer,
    DevopsEngineer,
    SecurityEngineer,
    DatabaseArchitect,
    SystemArchitect,

    // Dynamic roles
    ManifestEnforcer,
    HyperUxFlow,
    HyperResearch,
    LodPrototyper,
    IdeaAlchemist,
    HelixBioArchitect,
    HyperNarrator,
    DocSyncer,
    HyperFlowDimmer,
    HyperfocusCatalyst,
}

impl AgentRole {
    pub const ALL: [AgentRole; 19] = [
        AgentRole::Orchestrator,
        AgentRole::ProjectStrategist,
        AgentRole::FrontendSpecialist,
        AgentRole::BackendSpecialist,
        AgentRole::QaEngineer,
        AgentRole::DevopsEngineer,
        AgentRole::SecurityEngineer,
        AgentRole::DatabaseArchitect,
        AgentRole::SystemArchitect,
        AgentRole::ManifestEnforcer,
        AgentRole::HyperUxFlow,
        AgentRole::HyperResearch,
        AgentRole::LodPrototyper,
        AgentRole::IdeaAlchemist,
        AgentRole::HelixBioArchitect,
        AgentRole::HyperNarrator,
        AgentRole::DocSyncer,
        AgentRole::HyperFlowDimmer,
        AgentRole::HyperfocusCatalyst,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Orchestrator => "broski_orchestrator",
            AgentRole::ProjectStrategist => "project_strategist",
            AgentRole::FrontendSpecialist => "frontend_specialist",
            AgentRole::BackendSpecialist => "backend_specialist",
            AgentRole::QaEngineer => "qa_engineer",
            AgentRole::DevopsEngineer => "devops_engineer",
            AgentRole::SecurityEngineer => "security_engineer",
            AgentRole::DatabaseArchitect => "database_architect",
            AgentRole::SystemArchitect => "system_architect",
            AgentRole::ManifestEnforcer => "manifest_enforcer",
            AgentRole::HyperUxFlow => "hyper_ux_flow",
            AgentRole::HyperResearch => "hyper_research",
            AgentRole::LodPrototyper => "lod_prototyper",
            AgentRole::IdeaAlchemist => "idea_alchemist",
            AgentRole::HelixBioArchitect => "helix_bio_architect",
            AgentRole::HyperNarrator => "hyper_narrator",
            AgentRole::DocSyncer => "doc_syncer",
            AgentRole::HyperFlowDimmer => "hyper_flow_dimmer",
            AgentRole::HyperfocusCatalyst => "hyperfocus_catalyst",
        }
    }

    pub fn is_orchestrator(&self) -> bool {
        matches!(self, AgentRole::Orchestrator)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = ControlPlaneError;

    /// Accepts the snake_case role name; hyphens are treated as underscores
    /// so agent names like `qa-engineer` resolve too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == normalized)
            .ok_or_else(|| ControlPlaneError::validation("role", format!("Unknown role: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewConfig {
    pub phase: ProjectPhase,
    pub primary_agents: Vec<AgentRole>,
    #[serde(default)]
    pub support_agents: Vec<AgentRole>,
    pub gatekeeper: AgentRole,
}

impl CrewConfig {
    /// Roles routable while this crew is current, orchestrator included.
    /// The gatekeeper is always part of the set even when it is neither a
    /// primary nor a support agent of the phase.
    pub fn active_roles(&self) -> BTreeSet<AgentRole> {
        self.primary_agents
            .iter()
            .chain(self.support_agents.iter())
            .copied()
            .chain([self.gatekeeper, AgentRole::Orchestrator])
            .collect()
    }
}

/// Crew table keyed by phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrewCatalog {
    crews: HashMap<ProjectPhase, CrewConfig>,
}

impl CrewCatalog {
    pub fn new(crews: impl IntoIterator<Item = CrewConfig>) -> Self {
        Self {
            crews: crews.into_iter().map(|c| (c.phase, c)).collect(),
        }
    }

    pub fn get(&self, phase: ProjectPhase) -> Option<&CrewConfig> {
        self.crews.get(&phase)
    }

    pub fn phases(&self) -> impl Iterator<Item = ProjectPhase> + '_ {
        self.crews.keys().copied()
    }

    /// Overlay `overrides` on top of this catalog, replacing whole crews.
    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = CrewConfig>) -> Self {
        for crew in overrides {
            self.crews.insert(crew.phase, crew);
        }
        self
    }
}

impl Default for CrewCatalog {
    fn default() -> Self {
        use AgentRole::*;
        Self::new([
            CrewConfig {
                phase: ProjectPhase::Planning,
                primary_agents: vec![ProjectStrategist, IdeaAlchemist],
                support_agents: vec![HyperResearch, HyperNarrator],
                gatekeeper: ProjectStrategist,
            },
            CrewConfig {
                phase: ProjectPhase::Architecture,
                primary_agents: vec![SystemArchitect, DatabaseArchitect],
                support_agents: vec![SecurityEngineer, HelixBioArchitect],
                gatekeeper: SystemArchitect,
            },
            CrewConfig {
                phase: ProjectPhase::Development,
                primary_agents: vec![FrontendSpecialist, BackendSpecialist],
                support_agents: vec![HyperUxFlow, DocSyncer, ManifestEnforcer],
                gatekeeper: QaEngineer,
            },
            CrewConfig {
                phase: ProjectPhase::Testing,
                primary_agents: vec![QaEngineer, SecurityEngineer],
                support_agents: vec![HyperFlowDimmer],
                gatekeeper: QaEngineer,
            },
            CrewConfig {
                phase: ProjectPhase::Deployment,
                primary_agents: vec![DevopsEngineer],
                support_agents: vec![DocSyncer, HyperNarrator],
                gatekeeper: SecurityEngineer,
            },
            CrewConfig {
                phase: ProjectPhase::Maintenance,
                primary_agents: vec![DevopsEngineer, BackendSpecialist],
                support_agents: vec![SecurityEngineer, DocSyncer],
                gatekeeper: DevopsEngineer,
            },
        ])
    }
}

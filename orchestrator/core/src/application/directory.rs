// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::registry::AgentRegistry;
use crate::domain::agent::{AgentDescriptor, AgentStatus};
use crate::domain::crew::AgentRole;
use crate::domain::error::ControlPlaneError;
use crate::domain::node_config::AgentEndpoint;

/// Where a named agent can be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAgent {
    pub name: String,
    pub role: Option<AgentRole>,
    pub base_url: String,
}

/// Resolves agent names and roles to service URLs.
///
/// Statically configured endpoints win; otherwise the registry is consulted
/// and a live agent is preferred over a stale or offline one.
pub struct AgentDirectory {
    endpoints: BTreeMap<AgentRole, String>,
    registry: Arc<dyn AgentRegistry>,
}

impl AgentDirectory {
    pub fn new(endpoints: &[AgentEndpoint], registry: Arc<dyn AgentRegistry>) -> Self {
        Self {
            endpoints: endpoints
                .iter()
                .map(|e| (e.role, e.url.trim_end_matches('/').to_string()))
                .collect(),
            registry,
        }
    }

    /// Registered agents whose declared role is `role`.
    pub async fn registered_with_role(
        &self,
        role: AgentRole,
    ) -> Result<Vec<AgentDescriptor>, ControlPlaneError> {
        Ok(self
            .registry
            .list()
            .await?
            .into_iter()
            .filter(|a| a.role.parse::<AgentRole>().ok() == Some(role))
            .collect())
    }

    /// Resolve a role name (`qa_engineer`, `qa-engineer`) or a registered
    /// agent name.
    pub async fn resolve(&self, name: &str) -> Result<ResolvedAgent, ControlPlaneError> {
        if let Ok(role) = name.parse::<AgentRole>() {
            if let Some(url) = self.endpoints.get(&role) {
                return Ok(ResolvedAgent {
                    name: role.to_string(),
                    role: Some(role),
                    base_url: url.clone(),
                });
            }
            let mut candidates = self.registered_with_role(role).await?;
            candidates.sort_by_key(|a| liveness_rank(a.status));
            if let Some(agent) = candidates.first() {
                return Ok(ResolvedAgent {
                    name: role.to_string(),
                    role: Some(role),
                    base_url: agent.base_url(),
                });
            }
        }

        let agents = self.registry.list().await?;
        agents
            .iter()
            .find(|a| a.name == name)
            .map(|a| ResolvedAgent {
                name: a.name.clone(),
                role: a.role.parse().ok(),
                base_url: a.base_url(),
            })
            .ok_or_else(|| ControlPlaneError::not_found("agent", name))
    }

    /// Every agent the directory knows about, configured first, each once.
    pub async fn known_agents(&self) -> Result<Vec<ResolvedAgent>, ControlPlaneError> {
        let mut known: Vec<ResolvedAgent> = self
            .endpoints
            .iter()
            .map(|(role, url)| ResolvedAgent {
                name: role.to_string(),
                role: Some(*role),
                base_url: url.clone(),
            })
            .collect();

        for agent in self.registry.list().await? {
            let role: Option<AgentRole> = agent.role.parse().ok();
            if role.map(|r| self.endpoints.contains_key(&r)).unwrap_or(false) {
                continue;
            }
            known.push(ResolvedAgent {
                name: agent.name.clone(),
                role,
                base_url: agent.base_url(),
            });
        }
        Ok(known)
    }
}

fn liveness_rank(status: AgentStatus) -> u8 {
    match status {
        AgentStatus::Active => 0,
        AgentStatus::Stale => 1,
        AgentStatus::Offline => 2,
    }
}

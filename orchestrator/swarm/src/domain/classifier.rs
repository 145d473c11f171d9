// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Task Classification
//!
//! Maps free-text task descriptions to the role that should own them.
//! [`SwarmManager`](crate::application::SwarmManager) only sees the
//! [`TaskClassifier`] trait, so the keyword matcher can be replaced without
//! touching phase logic.

use crewplane_core::domain::crew::AgentRole;

pub trait TaskClassifier: Send + Sync {
    fn classify(&self, text: &str) -> AgentRole;
}

/// Ordered substring rules; the first rule with a matching keyword wins.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(Vec<String>, AgentRole)>,
    fallback: AgentRole,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<(Vec<String>, AgentRole)>, fallback: AgentRole) -> Self {
        let rules = rules
            .into_iter()
            .map(|(keywords, role)| {
                (keywords.into_iter().map(|k| k.to_lowercase()).collect(), role)
            })
            .collect();
        Self { rules, fallback }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let rule = |keywords: &[&str], role| {
            (keywords.iter().map(|k| k.to_string()).collect::<Vec<_>>(), role)
        };
        Self::new(
            vec![
                rule(&["test", "bug"], AgentRole::QaEngineer),
                rule(&["deploy", "docker"], AgentRole::DevopsEngineer),
                rule(&["ui", "frontend", "css"], AgentRole::FrontendSpecialist),
                rule(&["api", "backend", "python"], AgentRole::BackendSpecialist),
                rule(&["db", "schema"], AgentRole::DatabaseArchitect),
                rule(&["security", "auth"], AgentRole::SecurityEngineer),
                rule(&["plan", "strategy"], AgentRole::ProjectStrategist),
                rule(&["arch", "system"], AgentRole::SystemArchitect),
            ],
            AgentRole::ProjectStrategist,
        )
    }
}

impl TaskClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> AgentRole {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k.as_str())))
            .map(|(_, role)| *role)
            .unwrap_or(self.fallback)
    }
}

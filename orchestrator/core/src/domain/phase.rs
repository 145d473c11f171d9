// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ControlPlaneError;

/// Project lifecycle phase. Exactly one is current system-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPhase {
    Planning,
    Architecture,
    Development,
    Testing,
    Deployment,
    Maintenance,
}

impl ProjectPhase {
    pub const ALL: [ProjectPhase; 6] = [
        ProjectPhase::Planning,
        ProjectPhase::Architecture,
        ProjectPhase::Development,
        ProjectPhase::Testing,
        ProjectPhase::Deployment,
        ProjectPhase::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPhase::Planning => "planning",
            ProjectPhase::Architecture => "architecture",
            ProjectPhase::Development => "development",
            ProjectPhase::Testing => "testing",
            ProjectPhase::Deployment => "deployment",
            ProjectPhase::Maintenance => "maintenance",
        }
    }
}

impl Default for ProjectPhase {
    fn default() -> Self {
        ProjectPhase::Planning
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectPhase {
    type Err = ControlPlaneError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ProjectPhase::ALL
            .into_iter()
            .find(|p| p.as_str() == normalized)
            .ok_or_else(|| ControlPlaneError::validation("phase", format!("Invalid phase: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("Testing".parse::<ProjectPhase>().unwrap(), ProjectPhase::Testing);
        assert_eq!(" DEPLOYMENT ".parse::<ProjectPhase>().unwrap(), ProjectPhase::Deployment);
    }

    #[test]
    fn test_unknown_phase_is_a_validation_error() {
        match "shipping".parse::<ProjectPhase>() {
            Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "phase"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_initial_phase_is_planning() {
        assert_eq!(ProjectPhase::default(), ProjectPhase::Planning);
    }
}

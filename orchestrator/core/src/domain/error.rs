// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Control Plane Error Taxonomy
//!
//! Every mutating call (register, phase change, handoff, publish) either
//! succeeds completely or returns one of these variants. Each variant carries
//! the field, check, agent or topic needed to act on it without server logs.

use thiserror::Error;

use crate::domain::repository::RepositoryError;
use crate::domain::task::TaskError;
use crate::domain::validation::ValidationReport;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    /// Malformed payload. Synchronous reject, never retried automatically.
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Unknown agent id / agent name / task id. For heartbeats this is the
    /// signal telling the caller to re-register.
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Publisher '{publisher}' is not allowed to publish on topic '{topic}'")]
    Permission { publisher: String, topic: String },

    #[error("Publisher '{publisher}' is paused after {consecutive_failures} consecutive failures")]
    Backpressure {
        publisher: String,
        consecutive_failures: u32,
    },

    #[error("Agent '{agent}' unreachable: {reason}")]
    Unreachable { agent: String, reason: String },

    #[error("Quality gate failed for transition {}", .0.transition)]
    QualityGate(Box<ValidationReport>),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ControlPlaneError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Short machine-readable tag used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Permission { .. } => "permission_denied",
            Self::Backpressure { .. } => "backpressure",
            Self::Unreachable { .. } => "unreachable",
            Self::QualityGate(_) => "quality_gate_failed",
            Self::Repository(_) => "store_error",
        }
    }
}

impl From<TaskError> for ControlPlaneError {
    fn from(err: TaskError) -> Self {
        ControlPlaneError::validation("status", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_item() {
        let err = ControlPlaneError::validation("version", "not semver");
        assert!(err.to_string().contains("version"));

        let err = ControlPlaneError::not_found("agent", "1234");
        assert_eq!(err.to_string(), "agent '1234' not found");

        let err = ControlPlaneError::Permission {
            publisher: "coder".to_string(),
            topic: "phase.changes".to_string(),
        };
        assert!(err.to_string().contains("coder"));
        assert!(err.to_string().contains("phase.changes"));
        assert_eq!(err.kind(), "permission_denied");
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Built-in fact-driven quality checks.
//!
//! Each check reads one reported fact from [`ProjectState`]. A fact nobody
//! reported yet yields `warning`, never `failed`: the gate only blocks on
//! evidence.

use crate::domain::phase::ProjectPhase;
use crate::domain::validation::{CheckResult, ProjectState, QualityCheck, ValidationStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum FactRule {
    /// `true` passes; `false` yields `on_false`.
    Flag { on_false: ValidationStatus },
    /// A number `>= min` passes; below fails.
    AtLeast { min: f64 },
    /// A number `<= max` passes; above fails.
    AtMost { max: f64 },
}

#[derive(Debug, Clone)]
pub struct FactCheck {
    name: String,
    fact: String,
    rule: FactRule,
}

impl FactCheck {
    pub fn new(name: impl Into<String>, fact: impl Into<String>, rule: FactRule) -> Self {
        Self {
            name: name.into(),
            fact: fact.into(),
            rule,
        }
    }
}

impl QualityCheck for FactCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, state: &ProjectState) -> CheckResult {
        let Some(value) = state.get(&self.fact) else {
            return CheckResult::new(
                &self.name,
                ValidationStatus::Warning,
                format!("'{}' has not been reported", self.fact),
            );
        };

        let (status, details) = match &self.rule {
            FactRule::Flag { on_false } => match value.as_bool() {
                Some(true) => (ValidationStatus::Passed, format!("'{}' is true", self.fact)),
                Some(false) => (*on_false, format!("'{}' is false", self.fact)),
                None => (
                    ValidationStatus::Failed,
                    format!("'{}' must be a boolean, got {}", self.fact, value),
                ),
            },
            FactRule::AtLeast { min } => match value.as_f64() {
                Some(n) if n >= *min => (
                    ValidationStatus::Passed,
                    format!("'{}' is {} (minimum {})", self.fact, n, min),
                ),
                Some(n) => (
                    ValidationStatus::Failed,
                    format!("'{}' is {}, below the minimum of {}", self.fact, n, min),
                ),
                None => (
                    ValidationStatus::Failed,
                    format!("'{}' must be a number, got {}", self.fact, value),
                ),
            },
            FactRule::AtMost { max } => match value.as_f64() {
                Some(n) if n <= *max => (
                    ValidationStatus::Passed,
                    format!("'{}' is {} (maximum {})", self.fact, n, max),
                ),
                Some(n) => (
                    ValidationStatus::Failed,
                    format!("'{}' is {}, above the maximum of {}", self.fact, n, max),
                ),
                None => (
                    ValidationStatus::Failed,
                    format!("'{}' must be a number, got {}", self.fact, value),
                ),
            },
        };
        CheckResult::new(&self.name, status, details)
    }
}

/// The gate for every forward transition, in evaluation order.
pub fn default_checks() -> Vec<(ProjectPhase, ProjectPhase, FactCheck)> {
    use ProjectPhase::*;
    let failed = ValidationStatus::Failed;
    vec![
        (
            Planning,
            Architecture,
            FactCheck::new(
                "Requirements Clarity",
                "requirements_documented",
                FactRule::Flag { on_false: failed },
            ),
        ),
        (
            Planning,
            Architecture,
            FactCheck::new("Feasibility Score", "feasibility_score", FactRule::AtLeast { min: 70.0 }),
        ),
        (
            Architecture,
            Development,
            FactCheck::new(
                "Architecture Approval",
                "architecture_approved",
                FactRule::Flag { on_false: failed },
            ),
        ),
        (
            Architecture,
            Development,
            FactCheck::new(
                "Database Schema Validation",
                "database_schema_valid",
                FactRule::Flag { on_false: failed },
            ),
        ),
        (
            Development,
            Testing,
            FactCheck::new("Code Linting", "lint_errors", FactRule::AtMost { max: 0.0 }),
        ),
        (
            Development,
            Testing,
            FactCheck::new(
                "Unit Tests Existence",
                "unit_tests_present",
                FactRule::Flag {
                    on_false: ValidationStatus::Warning,
                },
            ),
        ),
        (
            Development,
            Testing,
            FactCheck::new("Secret Scanning", "secrets_found", FactRule::AtMost { max: 0.0 }),
        ),
        (
            Testing,
            Deployment,
            FactCheck::new("Test Coverage", "test_coverage", FactRule::AtLeast { min: 80.0 }),
        ),
        (
            Testing,
            Deployment,
            FactCheck::new("E2E Tests", "e2e_tests_passed", FactRule::Flag { on_false: failed }),
        ),
        (
            Testing,
            Deployment,
            FactCheck::new(
                "Security Audit",
                "critical_vulnerabilities",
                FactRule::AtMost { max: 0.0 },
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unreported_fact_warns() {
        let check = FactCheck::new("E2E Tests", "e2e_tests_passed", FactRule::Flag {
            on_false: ValidationStatus::Failed,
        });
        let result = check.evaluate(&ProjectState::default());
        assert_eq!(result.status, ValidationStatus::Warning);
        assert!(result.details.contains("e2e_tests_passed"));
    }

    #[test]
    fn test_threshold_rules() {
        let coverage = FactCheck::new("Test Coverage", "test_coverage", FactRule::AtLeast { min: 80.0 });
        let state = ProjectState::default().with_fact("test_coverage", json!(79.5));
        assert_eq!(coverage.evaluate(&state).status, ValidationStatus::Failed);
        let state = ProjectState::default().with_fact("test_coverage", json!(91));
        assert_eq!(coverage.evaluate(&state).status, ValidationStatus::Passed);

        let lint = FactCheck::new("Code Linting", "lint_errors", FactRule::AtMost { max: 0.0 });
        let state = ProjectState::default().with_fact("lint_errors", json!(2));
        assert_eq!(lint.evaluate(&state).status, ValidationStatus::Failed);
    }

    #[test]
    fn test_wrong_fact_type_fails() {
        let check = FactCheck::new("Architecture Approval", "architecture_approved", FactRule::Flag {
            on_false: ValidationStatus::Failed,
        });
        let state = ProjectState::default().with_fact("architecture_approved", json!("yes"));
        assert_eq!(check.evaluate(&state).status, ValidationStatus::Failed);
    }

    #[test]
    fn test_missing_unit_tests_only_warn() {
        let (_, _, check) = default_checks()
            .into_iter()
            .find(|(_, _, c)| c.name() == "Unit Tests Existence")
            .unwrap();
        let state = ProjectState::default().with_fact("unit_tests_present", json!(false));
        assert_eq!(check.evaluate(&state).status, ValidationStatus::Warning);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::quality_checks::default_checks;
use crate::domain::error::ControlPlaneError;
use crate::domain::phase::ProjectPhase;
use crate::domain::validation::{ProjectState, QualityCheck, ValidationReport};

type TransitionKey = (ProjectPhase, ProjectPhase);

/// Evaluates the checks registered for a `(from, to)` transition against the
/// current [`ProjectState`].
///
/// Pairs with no registered checks pass trivially. Checks only read state,
/// so evaluation takes a read lock and runs concurrently with other reads.
pub struct QualityGateService {
    checks: HashMap<TransitionKey, Vec<Arc<dyn QualityCheck>>>,
    state: RwLock<ProjectState>,
}

impl QualityGateService {
    pub fn new() -> Self {
        Self {
            checks: HashMap::new(),
            state: RwLock::new(ProjectState::default()),
        }
    }

    /// Service with the built-in checks for every forward transition.
    pub fn with_default_checks() -> Self {
        let mut service = Self::new();
        for (from, to, check) in default_checks() {
            service.register(from, to, Arc::new(check));
        }
        service
    }

    /// Append `check` to the gate of `from -> to`.
    pub fn register(&mut self, from: ProjectPhase, to: ProjectPhase, check: Arc<dyn QualityCheck>) {
        debug!(from = %from, to = %to, check = %check.name(), "Registered quality check");
        self.checks.entry((from, to)).or_default().push(check);
    }

    pub fn with_check(mut self, from: ProjectPhase, to: ProjectPhase, check: Arc<dyn QualityCheck>) -> Self {
        self.register(from, to, check);
        self
    }

    pub fn check_names(&self, from: ProjectPhase, to: ProjectPhase) -> Vec<String> {
        self.checks
            .get(&(from, to))
            .map(|checks| checks.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default()
    }

    pub fn validate_phase_transition(&self, from: ProjectPhase, to: ProjectPhase) -> ValidationReport {
        let state = self.state.read();
        let results = self
            .checks
            .get(&(from, to))
            .map(|checks| checks.iter().map(|check| check.evaluate(&state)).collect())
            .unwrap_or_default();
        let report = ValidationReport::from_checks(from, to, results);
        debug!(
            transition = %report.transition,
            overall = %report.overall_status,
            checks = report.checks.len(),
            "Evaluated quality gate"
        );
        report
    }

    /// Record a reported fact; later evaluations see it.
    pub fn record_fact(&self, key: &str, value: serde_json::Value) -> Result<(), ControlPlaneError> {
        if key.trim().is_empty() {
            return Err(ControlPlaneError::validation("key", "must not be empty"));
        }
        info!(fact = %key, value = %value, "Project fact recorded");
        self.state.write().facts.insert(key.to_string(), value);
        Ok(())
    }

    pub fn facts(&self) -> ProjectState {
        self.state.read().clone()
    }
}

impl Default for QualityGateService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::{CheckResult, ValidationStatus};
    use serde_json::json;

    struct Fixed(&'static str, ValidationStatus);

    impl QualityCheck for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn evaluate(&self, _state: &ProjectState) -> CheckResult {
            CheckResult::new(self.0, self.1, "fixed")
        }
    }

    #[test]
    fn test_unregistered_pair_passes() {
        let service = QualityGateService::with_default_checks();
        let report = service.validate_phase_transition(ProjectPhase::Testing, ProjectPhase::Planning);
        assert_eq!(report.overall_status, ValidationStatus::Passed);
        assert!(report.checks.is_empty());
    }

    #[test]
    fn test_one_failing_check_fails_the_gate() {
        let service = QualityGateService::new()
            .with_check(
                ProjectPhase::Development,
                ProjectPhase::Testing,
                Arc::new(Fixed("a", ValidationStatus::Passed)),
            )
            .with_check(
                ProjectPhase::Development,
                ProjectPhase::Testing,
                Arc::new(Fixed("b", ValidationStatus::Failed)),
            );
        let report = service.validate_phase_transition(ProjectPhase::Development, ProjectPhase::Testing);
        assert_eq!(report.overall_status, ValidationStatus::Failed);
        assert_eq!(report.failed_checks(), vec!["b"]);
    }

    #[test]
    fn test_checks_keep_registration_order() {
        let service = QualityGateService::with_default_checks();
        assert_eq!(
            service.check_names(ProjectPhase::Development, ProjectPhase::Testing),
            vec!["Code Linting", "Unit Tests Existence", "Secret Scanning"]
        );
    }

    #[test]
    fn test_facts_drive_default_checks() {
        let service = QualityGateService::with_default_checks();
        service.record_fact("lint_errors", json!(0)).unwrap();
        service.record_fact("unit_tests_present", json!(true)).unwrap();
        service.record_fact("secrets_found", json!(0)).unwrap();
        let report = service.validate_phase_transition(ProjectPhase::Development, ProjectPhase::Testing);
        assert_eq!(report.overall_status, ValidationStatus::Passed);

        service.record_fact("secrets_found", json!(1)).unwrap();
        let report = service.validate_phase_transition(ProjectPhase::Development, ProjectPhase::Testing);
        assert_eq!(report.failed_checks(), vec!["Secret Scanning"]);
    }

    #[test]
    fn test_blank_fact_key_is_rejected() {
        let service = QualityGateService::new();
        assert!(service.record_fact(" ", json!(true)).is_err());
    }
}

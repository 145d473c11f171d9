// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Quality Gate Domain
//!
//! A quality gate is an ordered list of named [`QualityCheck`]s registered for
//! one `(from, to)` phase pair. Each check looks at the reported
//! [`ProjectState`] and returns a [`CheckResult`]; the gate folds the results
//! into a [`ValidationReport`].
//!
//! Aggregation never depends on which checks exist:
//!
//! ```text
//! any failed  -> failed
//! any warning -> warning
//! otherwise   -> passed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::phase::ProjectPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Warning,
    Failed,
    Pending,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Passed => "passed",
            ValidationStatus::Warning => "warning",
            ValidationStatus::Failed => "failed",
            ValidationStatus::Pending => "pending",
        }
    }

    /// Fold individual check statuses into the overall gate status.
    ///
    /// `pending` checks neither fail nor warn; an empty gate passes.
    pub fn aggregate<'a>(statuses: impl IntoIterator<Item = &'a ValidationStatus>) -> Self {
        let mut overall = ValidationStatus::Passed;
        for status in statuses {
            match status {
                ValidationStatus::Failed => return ValidationStatus::Failed,
                ValidationStatus::Warning => overall = ValidationStatus::Warning,
                ValidationStatus::Passed | ValidationStatus::Pending => {}
            }
        }
        overall
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub status: ValidationStatus,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    pub fn new(
        check_name: impl Into<String>,
        status: ValidationStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            check_name: check_name.into(),
            status,
            details: details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of evaluating one transition. Produced per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Human-readable `"<from> -> <to>"`.
    pub transition: String,
    pub from: ProjectPhase,
    pub to: ProjectPhase,
    pub overall_status: ValidationStatus,
    pub checks: Vec<CheckResult>,
}

impl ValidationReport {
    pub fn from_checks(from: ProjectPhase, to: ProjectPhase, checks: Vec<CheckResult>) -> Self {
        let overall_status = ValidationStatus::aggregate(checks.iter().map(|c| &c.status));
        Self {
            transition: format!("{} -> {}", from, to),
            from,
            to,
            overall_status,
            checks,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.overall_status == ValidationStatus::Failed
    }

    /// Names of the checks that failed, in evaluation order.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| c.status == ValidationStatus::Failed)
            .map(|c| c.check_name.as_str())
            .collect()
    }
}

/// Facts reported about the project (test results, approvals, scores).
///
/// Checks read facts by key; a fact nobody has reported yet is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default)]
    pub facts: BTreeMap<String, serde_json::Value>,
}

impl ProjectState {
    pub fn with_fact(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.facts.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.facts.get(key)
    }
}

/// A named, idempotent predicate over [`ProjectState`].
///
/// Implementations must not mutate anything; the same state always yields the
/// same status.
pub trait QualityCheck: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, state: &ProjectState) -> CheckResult;
}

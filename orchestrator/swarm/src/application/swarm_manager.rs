// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Phase State Machine
//!
//! [`SwarmManager`] owns the one current [`ProjectPhase`] and its crew. Every
//! mutation goes through a single write lock: the gate is evaluated, the
//! decision taken and the new crew installed without releasing it, so a
//! reader sees either the old phase and crew or the new pair, never a mix.
//!
//! The manager is constructed by the daemon and shared by `Arc`; it is not a
//! process-wide singleton.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crewplane_core::application::QualityGateService;
use crewplane_core::domain::crew::{AgentRole, CrewCatalog, CrewConfig};
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::PhaseEvent;
use crewplane_core::domain::phase::ProjectPhase;
use crewplane_core::domain::validation::ValidationReport;
use crewplane_core::infrastructure::event_bus::EventBus;

use crate::domain::classifier::TaskClassifier;
use crate::domain::crew::{CrewSnapshot, PhaseChange};

#[derive(Debug, Clone)]
struct SwarmState {
    phase: ProjectPhase,
    crew: CrewConfig,
}

pub struct SwarmManager {
    state: RwLock<SwarmState>,
    catalog: CrewCatalog,
    gates: Arc<QualityGateService>,
    classifier: Arc<dyn TaskClassifier>,
    event_bus: EventBus,
}

impl SwarmManager {
    /// Start in [`ProjectPhase::Planning`]. Fails when the catalog has no
    /// crew for planning.
    pub fn new(
        catalog: CrewCatalog,
        gates: Arc<QualityGateService>,
        classifier: Arc<dyn TaskClassifier>,
        event_bus: EventBus,
    ) -> Result<Self, ControlPlaneError> {
        let phase = ProjectPhase::default();
        let crew = crew_for(&catalog, phase)?;
        Ok(Self {
            state: RwLock::new(SwarmState { phase, crew }),
            catalog,
            gates,
            classifier,
            event_bus,
        })
    }

    pub fn current_phase(&self) -> ProjectPhase {
        self.state.read().phase
    }

    pub fn crew_snapshot(&self) -> CrewSnapshot {
        CrewSnapshot::from(&self.state.read().crew)
    }

    pub fn gatekeeper(&self) -> AgentRole {
        self.state.read().crew.gatekeeper
    }

    /// Roles routable right now, orchestrator included.
    pub fn active_roles(&self) -> Vec<AgentRole> {
        self.state.read().crew.active_roles().into_iter().collect()
    }

    pub fn is_agent_active(&self, role: AgentRole) -> bool {
        role.is_orchestrator() || self.state.read().crew.active_roles().contains(&role)
    }

    pub fn recommend_agent_for_task(&self, text: &str) -> AgentRole {
        self.classifier.classify(text)
    }

    /// Non-mutating gate evaluation from the current phase to `target`.
    pub fn validate_transition(&self, target: ProjectPhase) -> ValidationReport {
        let from = self.current_phase();
        self.gates.validate_phase_transition(from, target)
    }

    /// Install the crew of `target` without consulting the gate.
    ///
    /// Only callers that already hold a passing report, or deliberately
    /// bypass it, should use this; [`transition`](Self::transition) is the
    /// gated entry point.
    pub fn activate_phase(&self, target: ProjectPhase) -> Result<PhaseChange, ControlPlaneError> {
        let mut state = self.state.write();
        self.install(&mut state, target, true, None)
    }

    /// Gated phase change.
    ///
    /// The gate is skipped when `target` is already current or `force` is
    /// set. A `failed` report leaves phase and crew untouched and returns
    /// [`ControlPlaneError::QualityGate`]; `warning` proceeds.
    pub fn transition(
        &self,
        target: ProjectPhase,
        force: bool,
    ) -> Result<PhaseChange, ControlPlaneError> {
        let mut state = self.state.write();
        let from = state.phase;

        if from == target || force {
            return self.install(&mut state, target, force, None);
        }

        let report = self.gates.validate_phase_transition(from, target);
        if report.is_failed() {
            let failed_checks: Vec<String> =
                report.failed_checks().into_iter().map(str::to_string).collect();
            warn!(
                from = %from,
                to = %target,
                failed = ?failed_checks,
                "Phase transition rejected by quality gate"
            );
            metrics::counter!("crewplane_phase_transitions_total", "outcome" => "rejected")
                .increment(1);
            self.event_bus.publish_phase_event(PhaseEvent::TransitionRejected {
                from,
                to: target,
                failed_checks,
                rejected_at: Utc::now(),
            });
            return Err(ControlPlaneError::QualityGate(Box::new(report)));
        }

        self.install(&mut state, target, false, Some(report))
    }

    fn install(
        &self,
        state: &mut SwarmState,
        target: ProjectPhase,
        forced: bool,
        validation: Option<ValidationReport>,
    ) -> Result<PhaseChange, ControlPlaneError> {
        let crew = crew_for(&self.catalog, target)?;
        let previous = state.phase;
        state.phase = target;
        state.crew = crew.clone();

        let snapshot = CrewSnapshot::from(&crew);
        if previous == target {
            debug!(phase = %target, "Phase re-activated");
        } else {
            info!(
                from = %previous,
                to = %target,
                forced,
                gatekeeper = %crew.gatekeeper,
                "Project phase activated"
            );
        }
        metrics::counter!(
            "crewplane_phase_transitions_total",
            "outcome" => if forced { "forced" } else { "accepted" }
        )
        .increment(1);
        self.event_bus.publish_phase_event(PhaseEvent::PhaseActivated {
            from: previous,
            to: target,
            forced,
            gate_status: validation.as_ref().map(|r| r.overall_status),
            activated_at: Utc::now(),
        });

        Ok(PhaseChange {
            phase: target,
            previous_phase: previous,
            active_agents: snapshot.agents,
            gatekeeper: snapshot.gatekeeper,
            forced,
            validation,
        })
    }
}

fn crew_for(catalog: &CrewCatalog, phase: ProjectPhase) -> Result<CrewConfig, ControlPlaneError> {
    catalog
        .get(phase)
        .cloned()
        .ok_or_else(|| ControlPlaneError::not_found("crew", phase.as_str()))
}

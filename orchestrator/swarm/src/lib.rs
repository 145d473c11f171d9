// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `crewplane-swarm`: Phase, Crew and Handoff Coordination
//!
//! Owns the single current project phase and everything routed by it.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `TaskClassifier`, `KeywordClassifier`, crew snapshots |
//! | [`application`] | Application | `SwarmManager`, `HandoffCoordinator`, `TaskService`, `WorkflowService` |
//!
//! ## Key Concepts
//!
//! - **Phase**: exactly one of six lifecycle phases is current. Only
//!   `SwarmManager::transition` moves it, behind the quality gate unless forced.
//! - **Crew**: the roles routable in the current phase, plus the orchestrator.
//! - **Handoff**: a task moving between agents; accepted only for routable
//!   targets, queued for known-but-inactive ones, rejected for unknown roles.

pub mod application;
pub mod domain;

pub use domain::*;

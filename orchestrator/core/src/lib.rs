// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Core of the crewplane control plane.
//!
//! # Architecture
//!
//! - **domain:** agents, phases, crews, events, quality gates, tasks, handoffs, config
//! - **application:** agent registry, event gateway, quality gate service, agent directory
//! - **infrastructure:** broadcast event bus, repositories, PostgreSQL pool, agent HTTP client

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;

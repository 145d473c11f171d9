// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: control-plane types, invariants and persistence contracts.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O besides the repository traits

pub mod agent;
pub mod crew;
pub mod error;
pub mod events;
pub mod handoff;
pub mod node_config;
pub mod phase;
pub mod repository;
pub mod task;
pub mod validation;
pub mod workflow;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! crewplane CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** HTTP API of the control plane daemon and the CLI commands that drive it

pub mod commands;
pub mod daemon;

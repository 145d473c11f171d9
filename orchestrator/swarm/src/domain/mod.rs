// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure types for phase and routing decisions. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`classifier`] | `TaskClassifier`, `KeywordClassifier` |
//! | [`crew`] | `CrewSnapshot`, `PhaseChange` |

pub mod classifier;
pub mod crew;

pub use classifier::*;
pub use crew::*;

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod directory;
pub mod event_gateway;
pub mod quality_checks;
pub mod quality_gate;
pub mod registry;

pub use directory::{AgentDirectory, ResolvedAgent};
pub use event_gateway::EventGateway;
pub use quality_gate::QualityGateService;
pub use registry::{AgentRegistry, StandardAgentRegistry};

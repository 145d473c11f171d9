// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Wire types shared with the control plane.

pub use crewplane_core::domain::agent::{
    AgentId, AgentStatus, Heartbeat, HeartbeatAck, RegistrationReceipt, RegistrationRequest,
};
pub use crewplane_core::domain::events::{PublishReceipt, PublishRequest, PublisherHealth};
pub use crewplane_core::domain::handoff::{HandoffOutcome, HandoffRequest};

use serde::{Deserialize, Serialize};

/// Body of `POST /events/publishers/{publisher}/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub success: bool,
}

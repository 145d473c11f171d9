// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod handoff;
pub mod swarm_manager;
pub mod tasks;
pub mod workflows;

pub use handoff::HandoffCoordinator;
pub use swarm_manager::SwarmManager;
pub use tasks::{PlanReceipt, PlanRequest, TaskResultReport, TaskService};
pub use workflows::WorkflowService;

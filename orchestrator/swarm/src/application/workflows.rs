// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Starting predefined workflows.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::TaskEvent;
use crewplane_core::domain::repository::WorkflowRepository;
use crewplane_core::domain::workflow::{WorkflowReceipt, WorkflowRecord, WorkflowRequest, WorkflowType};
use crewplane_core::infrastructure::event_bus::EventBus;

pub struct WorkflowService {
    repository: Arc<dyn WorkflowRepository>,
    event_bus: EventBus,
}

impl WorkflowService {
    pub fn new(repository: Arc<dyn WorkflowRepository>, event_bus: EventBus) -> Self {
        Self {
            repository,
            event_bus,
        }
    }

    /// Record a new `initiated` workflow of `workflow_type`. An unknown type
    /// or a blank description is a validation error and stores nothing.
    pub async fn start(
        &self,
        workflow_type: &str,
        request: WorkflowRequest,
    ) -> Result<WorkflowReceipt, ControlPlaneError> {
        let workflow_type: WorkflowType = workflow_type.parse()?;
        if request.description.trim().is_empty() {
            return Err(ControlPlaneError::validation("description", "must not be empty"));
        }

        let now = Utc::now();
        let record = WorkflowRecord::new(workflow_type, request.description, now);
        self.repository.save(&record).await?;

        info!(
            workflow_id = %record.workflow_id,
            workflow_type = %workflow_type,
            steps = record.agents.len(),
            "Workflow started"
        );
        metrics::counter!("crewplane_workflows_started_total", "type" => workflow_type.as_str())
            .increment(1);
        self.event_bus.publish_task_event(TaskEvent::WorkflowStarted {
            workflow_id: record.workflow_id.clone(),
            workflow_type: workflow_type.to_string(),
            agents: record.agents.iter().map(|r| r.to_string()).collect(),
            started_at: now,
        });

        Ok(WorkflowReceipt::from(&record))
    }

    pub async fn get(&self, workflow_id: &str) -> Result<WorkflowRecord, ControlPlaneError> {
        self.repository
            .find_by_id(workflow_id)
            .await?
            .ok_or_else(|| ControlPlaneError::not_found("workflow", workflow_id))
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task intake and delegation.
//!
//! `plan` persists a [`TaskRecord`] in `planning` and returns immediately.
//! Delegation to the strategist's `POST /plan` runs in a spawned task and
//! moves the record to `delegated` (with the plan) or `error`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crewplane_core::application::AgentDirectory;
use crewplane_core::domain::crew::AgentRole;
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::TaskEvent;
use crewplane_core::domain::repository::TaskRepository;
use crewplane_core::domain::task::{TaskId, TaskRecord, TaskStatus};
use crewplane_core::infrastructure::agent_client::AgentClient;
use crewplane_core::infrastructure::event_bus::EventBus;

use crate::application::swarm_manager::SwarmManager;

/// Body of `POST /plan`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    pub task: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReceipt {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub assigned_agents: Vec<AgentRole>,
    pub recommended_agent: AgentRole,
}

/// Body of `POST /task/{id}/result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultReport {
    pub status: TaskStatus,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
    swarm: Arc<SwarmManager>,
    directory: Arc<AgentDirectory>,
    client: Arc<dyn AgentClient>,
    event_bus: EventBus,
    write_lock: Arc<Mutex<()>>,
}

impl TaskService {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        swarm: Arc<SwarmManager>,
        directory: Arc<AgentDirectory>,
        client: Arc<dyn AgentClient>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            repository,
            swarm,
            directory,
            client,
            event_bus,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn plan(&self, request: PlanRequest) -> Result<PlanReceipt, ControlPlaneError> {
        if request.task.trim().is_empty() {
            return Err(ControlPlaneError::validation("task", "must not be empty"));
        }
        let now = Utc::now();
        let record = TaskRecord::new(request.task.clone(), request.context.clone(), now);
        self.repository.save(&record).await?;

        let recommended = self.swarm.recommend_agent_for_task(&request.task);
        let mut assigned = vec![AgentRole::ProjectStrategist];
        if recommended != AgentRole::ProjectStrategist {
            assigned.push(recommended);
        }

        info!(
            task_id = %record.task_id,
            recommended = %recommended,
            "Task accepted for planning"
        );
        metrics::counter!("crewplane_tasks_planned_total").increment(1);
        self.event_bus.publish_task_event(TaskEvent::TaskPlanned {
            task_id: record.task_id.to_string(),
            assigned_agents: assigned.iter().map(|r| r.to_string()).collect(),
            planned_at: now,
        });

        let service = self.clone();
        let task_id = record.task_id.clone();
        tokio::spawn(async move {
            service.delegate(task_id, request, recommended).await;
        });

        Ok(PlanReceipt {
            task_id: record.task_id,
            status: TaskStatus::Planning,
            assigned_agents: assigned,
            recommended_agent: recommended,
        })
    }

    pub async fn get(&self, task_id: &str) -> Result<TaskRecord, ControlPlaneError> {
        self.repository
            .find_by_id(&TaskId(task_id.to_string()))
            .await?
            .ok_or_else(|| ControlPlaneError::not_found("task", task_id))
    }

    /// Final report from the agent working on `task_id`.
    pub async fn record_result(
        &self,
        task_id: &str,
        report: TaskResultReport,
    ) -> Result<TaskRecord, ControlPlaneError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.get(task_id).await?;
        let now = Utc::now();
        match report.status {
            TaskStatus::Completed => record.complete(report.result, now)?,
            TaskStatus::Error => {
                let error = report
                    .error
                    .unwrap_or_else(|| "agent reported an error".to_string());
                record.fail(error, now)?
            }
            other => {
                return Err(ControlPlaneError::validation(
                    "status",
                    format!("a result must be completed or error, got {}", other),
                ))
            }
        }
        self.repository.save(&record).await?;

        info!(task_id = %task_id, status = %record.status, "Task finished");
        self.event_bus.publish_task_event(TaskEvent::TaskFinished {
            task_id: task_id.to_string(),
            status: record.status.to_string(),
            finished_at: now,
        });
        Ok(record)
    }

    async fn delegate(&self, task_id: TaskId, request: PlanRequest, recommended: AgentRole) {
        let strategist = AgentRole::ProjectStrategist;
        let payload = serde_json::json!({
            "task_id": task_id,
            "task": request.task,
            "context": request.context,
            "recommended_agent": recommended,
        });

        let outcome = match self.directory.resolve(strategist.as_str()).await {
            Ok(target) => self.client.plan(&target.name, &target.base_url, &payload).await,
            Err(e) => Err(e),
        };

        let _guard = self.write_lock.lock().await;
        let mut record = match self.repository.find_by_id(&task_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(task_id = %task_id, "Task vanished before delegation finished");
                return;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Failed to load task for delegation");
                return;
            }
        };

        let now = Utc::now();
        let applied = match outcome {
            Ok(plan) => record.delegate(strategist.as_str(), plan, now).map(|_| {
                info!(task_id = %task_id, agent = %strategist, "Task delegated");
                self.event_bus.publish_task_event(TaskEvent::TaskDelegated {
                    task_id: task_id.to_string(),
                    agent: strategist.to_string(),
                    delegated_at: now,
                });
            }),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Task delegation failed");
                metrics::counter!("crewplane_task_delegation_failures_total").increment(1);
                record.fail(e.to_string(), now)
            }
        };
        if let Err(e) = applied {
            warn!(task_id = %task_id, error = %e, "Task moved on before delegation finished");
            return;
        }
        if let Err(e) = self.repository.save(&record).await {
            warn!(task_id = %task_id, error = %e, "Failed to persist delegation outcome");
        }
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Handoff Coordinator
//!
//! Moves an in-flight task from one agent to another. The outcome is
//! decided synchronously against the current crew; the dispatch to the
//! target's `POST /execute` runs in a spawned task and the caller is
//! acknowledged once it is scheduled.
//!
//! | Target | Outcome |
//! |--------|---------|
//! | not a known role or registered agent | `rejected` |
//! | known role outside the current crew | `queued` |
//! | in the crew but every registered instance offline, or no endpoint | `queued` |
//! | otherwise | `accepted`, one log entry appended, dispatch spawned |
//!
//! Queued handoffs are kept for inspection and never redelivered. The queue
//! holds the latest request per `(task_id, role)`, bounded by its capacity
//! with the oldest entry evicted first. A later accepted handoff of the same
//! task to the same role clears its queued entry.

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crewplane_core::application::{AgentDirectory, ResolvedAgent};
use crewplane_core::domain::agent::AgentStatus;
use crewplane_core::domain::crew::AgentRole;
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::HandoffEvent;
use crewplane_core::domain::handoff::{HandoffLogEntry, HandoffOutcome, HandoffRequest, QueuedHandoff};
use crewplane_core::domain::repository::HandoffLogRepository;
use crewplane_core::infrastructure::agent_client::AgentClient;
use crewplane_core::infrastructure::event_bus::EventBus;

use crate::application::swarm_manager::SwarmManager;

enum Route {
    Dispatch(ResolvedAgent),
    Queue(String),
}

pub struct HandoffCoordinator {
    swarm: Arc<SwarmManager>,
    directory: Arc<AgentDirectory>,
    client: Arc<dyn AgentClient>,
    log: Arc<dyn HandoffLogRepository>,
    event_bus: EventBus,
    task_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
    queued: Mutex<HandoffQueue>,
}

/// Latest parked request per `(task_id, role)`, with an insertion sequence
/// for oldest-first listing and eviction.
struct HandoffQueue {
    entries: HashMap<(String, AgentRole), (u64, QueuedHandoff)>,
    next_seq: u64,
    capacity: usize,
}

impl HandoffQueue {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    fn park(&mut self, key: (String, AgentRole), handoff: QueuedHandoff) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, (seq, _))| *seq)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                self.entries.remove(&oldest);
                metrics::counter!("crewplane_queued_handoffs_evicted_total").increment(1);
            }
        }
        self.entries.insert(key, (self.next_seq, handoff));
        self.next_seq += 1;
    }

    fn clear(&mut self, key: &(String, AgentRole)) {
        self.entries.remove(key);
    }

    fn oldest_first(&self) -> Vec<QueuedHandoff> {
        let mut parked: Vec<&(u64, QueuedHandoff)> = self.entries.values().collect();
        parked.sort_by_key(|(seq, _)| *seq);
        parked.into_iter().map(|(_, q)| q.clone()).collect()
    }
}

impl HandoffCoordinator {
    pub fn new(
        swarm: Arc<SwarmManager>,
        directory: Arc<AgentDirectory>,
        client: Arc<dyn AgentClient>,
        log: Arc<dyn HandoffLogRepository>,
        event_bus: EventBus,
        queue_capacity: usize,
    ) -> Self {
        Self {
            swarm,
            directory,
            client,
            log,
            event_bus,
            task_locks: DashMap::new(),
            queued: Mutex::new(HandoffQueue::new(queue_capacity)),
        }
    }

    pub async fn handoff(&self, request: HandoffRequest) -> Result<HandoffOutcome, ControlPlaneError> {
        request.validate()?;

        let Some(role) = self.target_role(&request.target_agent).await? else {
            let reason = format!("'{}' is not a known agent role", request.target_agent);
            return Ok(self.reject(request, reason));
        };

        if !self.swarm.is_agent_active(role) {
            let reason = format!(
                "{} is not in the active crew for phase {}",
                role,
                self.swarm.current_phase()
            );
            return Ok(self.queue(request, role, reason));
        }

        let target = match self.route(role).await? {
            Route::Dispatch(target) => target,
            Route::Queue(reason) => return Ok(self.queue(request, role, reason)),
        };

        let entry = self
            .append_ordered(&request.task_id, &request.source_agent, role)
            .await?;
        self.queued.lock().clear(&(request.task_id.clone(), role));

        info!(
            task_id = %request.task_id,
            source = %request.source_agent,
            target = %role,
            "Handoff accepted"
        );
        metrics::counter!("crewplane_handoffs_total", "outcome" => "accepted").increment(1);
        self.event_bus.publish_handoff_event(HandoffEvent::HandoffAccepted {
            task_id: request.task_id.clone(),
            source: request.source_agent.clone(),
            target: role.to_string(),
            accepted_at: entry.timestamp,
        });

        self.spawn_dispatch(&request, target);

        Ok(HandoffOutcome::Accepted {
            task_id: request.task_id,
            target: role.to_string(),
        })
    }

    /// Ordered handoff log of `task_id`; empty when none was accepted.
    pub async fn history(&self, task_id: &str) -> Result<Vec<HandoffLogEntry>, ControlPlaneError> {
        Ok(self.log.history(task_id).await?)
    }

    /// Parked handoffs, oldest first.
    pub fn queued_handoffs(&self) -> Vec<QueuedHandoff> {
        self.queued.lock().oldest_first()
    }

    /// Role named by `target`: a role name directly, or the declared role of
    /// a registered agent with that name.
    async fn target_role(&self, target: &str) -> Result<Option<AgentRole>, ControlPlaneError> {
        if let Ok(role) = target.parse::<AgentRole>() {
            return Ok(Some(role));
        }
        match self.directory.resolve(target).await {
            Ok(resolved) => Ok(resolved.role),
            Err(ControlPlaneError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn route(&self, role: AgentRole) -> Result<Route, ControlPlaneError> {
        let registered = self.directory.registered_with_role(role).await?;
        if !registered.is_empty() && registered.iter().all(|a| a.status == AgentStatus::Offline) {
            return Ok(Route::Queue(format!("every registered {} is offline", role)));
        }
        match self.directory.resolve(role.as_str()).await {
            Ok(target) => Ok(Route::Dispatch(target)),
            Err(ControlPlaneError::NotFound { .. }) => {
                Ok(Route::Queue(format!("no endpoint is known for {}", role)))
            }
            Err(e) => Err(e),
        }
    }

    /// Append under the task's lock so concurrent handoffs of one task land
    /// in lock order with non-decreasing timestamps; different tasks never
    /// contend.
    async fn append_ordered(
        &self,
        task_id: &str,
        source: &str,
        role: AgentRole,
    ) -> Result<HandoffLogEntry, ControlPlaneError> {
        let lock = self
            .task_locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            let entry = HandoffLogEntry {
                source: source.to_string(),
                target: role.to_string(),
                timestamp: Utc::now(),
            };
            self.log.append(task_id, &entry).await.map(|_| entry)
        };
        drop(lock);
        self.task_locks
            .remove_if(task_id, |_, l| Arc::strong_count(l) == 1);
        Ok(result?)
    }

    fn spawn_dispatch(&self, request: &HandoffRequest, target: ResolvedAgent) {
        let client = self.client.clone();
        let event_bus = self.event_bus.clone();
        let payload = request.dispatch_payload();
        let task_id = request.task_id.clone();

        tokio::spawn(async move {
            if let Err(e) = client.dispatch(&target.name, &target.base_url, &payload).await {
                warn!(
                    task_id = %task_id,
                    target = %target.name,
                    error = %e,
                    "Handoff dispatch failed"
                );
                metrics::counter!("crewplane_handoff_dispatch_failures_total").increment(1);
                event_bus.publish_handoff_event(HandoffEvent::DispatchFailed {
                    task_id,
                    target: target.name,
                    reason: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        });
    }

    fn queue(&self, request: HandoffRequest, role: AgentRole, reason: String) -> HandoffOutcome {
        let now = Utc::now();
        info!(
            task_id = %request.task_id,
            target = %request.target_agent,
            reason = %reason,
            "Handoff queued"
        );
        metrics::counter!("crewplane_handoffs_total", "outcome" => "queued").increment(1);
        self.event_bus.publish_handoff_event(HandoffEvent::HandoffQueued {
            task_id: request.task_id.clone(),
            source: request.source_agent.clone(),
            target: request.target_agent.clone(),
            queued_at: now,
        });

        let outcome = HandoffOutcome::Queued {
            task_id: request.task_id.clone(),
            target: request.target_agent.clone(),
            reason: reason.clone(),
        };

        self.queued.lock().park(
            (request.task_id.clone(), role),
            QueuedHandoff {
                request,
                reason,
                queued_at: now,
            },
        );
        outcome
    }

    fn reject(&self, request: HandoffRequest, reason: String) -> HandoffOutcome {
        warn!(
            task_id = %request.task_id,
            target = %request.target_agent,
            "Handoff rejected: {}",
            reason
        );
        metrics::counter!("crewplane_handoffs_total", "outcome" => "rejected").increment(1);
        self.event_bus.publish_handoff_event(HandoffEvent::HandoffRejected {
            task_id: request.task_id.clone(),
            source: request.source_agent,
            target: request.target_agent.clone(),
            reason: reason.clone(),
            rejected_at: Utc::now(),
        });
        HandoffOutcome::Rejected {
            task_id: request.task_id,
            target: request.target_agent,
            reason,
        }
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Registry Service
//!
//! Idempotent registration keyed by `dedup_key`, heartbeat-driven liveness
//! and a change stream.
//!
//! Every read-modify-write on a descriptor (register, heartbeat, sweep) runs
//! under one async mutex, so upserts for a dedup key apply in arrival order
//! and a sweep never overwrites a heartbeat that landed mid-way.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::agent::{
    AgentDescriptor, AgentId, AgentStatus, Heartbeat, HeartbeatAck, LivenessThresholds,
    RegistrationReceipt, RegistrationRequest,
};
use crate::domain::error::ControlPlaneError;
use crate::domain::events::RegistryEvent;
use crate::domain::repository::AgentRepository;
use crate::infrastructure::event_bus::{DomainEvent, EventBus};

#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationReceipt, ControlPlaneError>;

    /// `NotFound` for an unknown (or malformed) id: the caller must re-register.
    async fn heartbeat(&self, heartbeat: Heartbeat) -> Result<HeartbeatAck, ControlPlaneError>;

    /// Age silent agents along `active → stale → offline`. Returns how many
    /// agents changed status.
    async fn sweep_stale(&self, now: DateTime<Utc>) -> Result<usize, ControlPlaneError>;

    async fn get(&self, id: AgentId) -> Result<AgentDescriptor, ControlPlaneError>;

    async fn list(&self) -> Result<Vec<AgentDescriptor>, ControlPlaneError>;

    /// Registry changes from now on. Never ends while the registry lives;
    /// a lagging consumer skips what it missed.
    fn watch(&self) -> BoxStream<'static, RegistryEvent>;
}

pub struct StandardAgentRegistry {
    repository: Arc<dyn AgentRepository>,
    event_bus: EventBus,
    thresholds: LivenessThresholds,
    write_lock: Mutex<()>,
}

impl StandardAgentRegistry {
    pub fn new(
        repository: Arc<dyn AgentRepository>,
        event_bus: EventBus,
        thresholds: LivenessThresholds,
    ) -> Self {
        Self {
            repository,
            event_bus,
            thresholds,
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl AgentRegistry for StandardAgentRegistry {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationReceipt, ControlPlaneError> {
        request.validate()?;
        let now = Utc::now();

        let _guard = self.write_lock.lock().await;
        match self.repository.find_by_dedup_key(&request.dedup_key).await? {
            Some(mut existing) => {
                existing.apply_registration(request, now);
                self.repository.save(&existing).await?;
                metrics::counter!("crewplane_registrations_total", "outcome" => "updated")
                    .increment(1);
                info!(agent_id = %existing.id, name = %existing.name, "Agent re-registered");
                self.event_bus.publish_registry_event(RegistryEvent::AgentUpdated {
                    agent_id: existing.id,
                    name: existing.name.clone(),
                    role: existing.role.clone(),
                    updated_at: now,
                });
                Ok(RegistrationReceipt {
                    id: existing.id,
                    created: false,
                })
            }
            None => {
                let descriptor = AgentDescriptor::from_registration(request, now);
                let stored_id = self.repository.save(&descriptor).await?;
                if stored_id != descriptor.id {
                    // Another instance created this dedup key first; the
                    // save updated its row.
                    metrics::counter!("crewplane_registrations_total", "outcome" => "updated")
                        .increment(1);
                    info!(agent_id = %stored_id, name = %descriptor.name, "Agent re-registered");
                    self.event_bus.publish_registry_event(RegistryEvent::AgentUpdated {
                        agent_id: stored_id,
                        name: descriptor.name.clone(),
                        role: descriptor.role.clone(),
                        updated_at: now,
                    });
                    return Ok(RegistrationReceipt {
                        id: stored_id,
                        created: false,
                    });
                }
                metrics::counter!("crewplane_registrations_total", "outcome" => "created")
                    .increment(1);
                info!(
                    agent_id = %descriptor.id,
                    name = %descriptor.name,
                    role = %descriptor.role,
                    "Agent registered"
                );
                self.event_bus.publish_registry_event(RegistryEvent::AgentRegistered {
                    agent_id: descriptor.id,
                    name: descriptor.name.clone(),
                    role: descriptor.role.clone(),
                    dedup_key: descriptor.dedup_key.clone(),
                    registered_at: now,
                });
                Ok(RegistrationReceipt {
                    id: descriptor.id,
                    created: true,
                })
            }
        }
    }

    async fn heartbeat(&self, heartbeat: Heartbeat) -> Result<HeartbeatAck, ControlPlaneError> {
        heartbeat.validate()?;
        let agent_id = AgentId::from_string(&heartbeat.agent_id)
            .map_err(|_| ControlPlaneError::not_found("agent", heartbeat.agent_id.clone()))?;
        let now = Utc::now();

        let _guard = self.write_lock.lock().await;
        let mut descriptor = self
            .repository
            .find_by_id(agent_id)
            .await?
            .ok_or_else(|| ControlPlaneError::not_found("agent", agent_id.to_string()))?;

        let previous = descriptor.record_heartbeat(&heartbeat, now);
        self.repository.save(&descriptor).await?;
        metrics::counter!("crewplane_heartbeats_total").increment(1);
        debug!(agent_id = %agent_id, load = heartbeat.load, "Heartbeat received");

        if previous != AgentStatus::Active {
            info!(agent_id = %agent_id, from = %previous, "Agent is active again");
            self.event_bus.publish_registry_event(RegistryEvent::AgentStatusChanged {
                agent_id,
                name: descriptor.name.clone(),
                from: previous,
                to: AgentStatus::Active,
                changed_at: now,
            });
        }

        Ok(HeartbeatAck {
            agent_id,
            status: descriptor.status,
            acknowledged_at: now,
        })
    }

    async fn sweep_stale(&self, now: DateTime<Utc>) -> Result<usize, ControlPlaneError> {
        let _guard = self.write_lock.lock().await;
        let mut changed = 0;
        for mut descriptor in self.repository.list_all().await? {
            let next = self.thresholds.status_for(descriptor.silence(now));
            if next == descriptor.status {
                continue;
            }
            let previous = descriptor.status;
            descriptor.status = next;
            self.repository.save(&descriptor).await?;
            changed += 1;

            metrics::counter!("crewplane_agent_status_changes_total", "to" => next.as_str())
                .increment(1);
            warn!(
                agent_id = %descriptor.id,
                name = %descriptor.name,
                from = %previous,
                to = %next,
                "Agent missed heartbeats"
            );
            self.event_bus.publish_registry_event(RegistryEvent::AgentStatusChanged {
                agent_id: descriptor.id,
                name: descriptor.name.clone(),
                from: previous,
                to: next,
                changed_at: now,
            });
        }
        Ok(changed)
    }

    async fn get(&self, id: AgentId) -> Result<AgentDescriptor, ControlPlaneError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ControlPlaneError::not_found("agent", id.to_string()))
    }

    async fn list(&self) -> Result<Vec<AgentDescriptor>, ControlPlaneError> {
        Ok(self.repository.list_all().await?)
    }

    fn watch(&self) -> BoxStream<'static, RegistryEvent> {
        self.event_bus
            .subscribe()
            .into_stream()
            .filter_map(|event| async move {
                match event {
                    DomainEvent::Registry(event) => Some(event),
                    _ => None,
                }
            })
            .boxed()
    }
}

/// Run `sweep_stale` every `interval` until `cancel` fires.
pub async fn run_sweeper(
    registry: Arc<dyn AgentRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Registry sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = registry.sweep_stale(Utc::now()).await {
                    warn!("Registry sweep failed: {}", e);
                }
            }
        }
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Heartbeat Loop
//!
//! One long-lived loop per agent process. Each tick does exactly one call:
//!
//! - no identity yet: register, keep the returned id;
//! - identity known: send a heartbeat;
//! - heartbeat answered 404: forget the id, register on the *next* tick.
//!
//! After a failed call the next tick comes after `retry_interval` instead of
//! `interval`. Nothing is retried inside a tick.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ClientError, CrewplaneClient};
use crate::types::{AgentId, Heartbeat, RegistrationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub retry_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            retry_interval: Duration::from_secs(5),
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Registered(AgentId),
    Acknowledged,
    /// The control plane answered 404; identity cleared.
    Forgotten,
    Failed(String),
}

type StatusReporter = Arc<dyn Fn() -> (String, f64) + Send + Sync>;

pub struct HeartbeatLoop {
    client: CrewplaneClient,
    registration: RegistrationRequest,
    config: HeartbeatConfig,
    identity: Option<AgentId>,
    reporter: StatusReporter,
}

impl HeartbeatLoop {
    pub fn new(client: CrewplaneClient, registration: RegistrationRequest) -> Self {
        Self {
            client,
            registration,
            config: HeartbeatConfig::default(),
            identity: None,
            reporter: Arc::new(|| ("active".to_string(), 0.0)),
        }
    }

    pub fn with_config(mut self, config: HeartbeatConfig) -> Self {
        self.config = config;
        self
    }

    /// Source of the `(status, load)` pair sent with every heartbeat.
    pub fn with_reporter(mut self, reporter: impl Fn() -> (String, f64) + Send + Sync + 'static) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    pub fn identity(&self) -> Option<AgentId> {
        self.identity
    }

    pub async fn tick(&mut self) -> TickOutcome {
        let Some(agent_id) = self.identity else {
            return match self.client.register(&self.registration).await {
                Ok(receipt) => {
                    info!(
                        agent_id = %receipt.id,
                        name = %self.registration.name,
                        created = receipt.created,
                        "Registered with control plane"
                    );
                    self.identity = Some(receipt.id);
                    TickOutcome::Registered(receipt.id)
                }
                Err(e) => {
                    warn!(name = %self.registration.name, error = %e, "Registration failed");
                    TickOutcome::Failed(e.to_string())
                }
            };
        };

        let (status, load) = (self.reporter)();
        let heartbeat = Heartbeat {
            agent_id: agent_id.to_string(),
            status,
            load,
        };
        match self.client.heartbeat(&heartbeat).await {
            Ok(_) => {
                debug!(agent_id = %agent_id, "Heartbeat acknowledged");
                TickOutcome::Acknowledged
            }
            Err(ClientError::UnknownAgent(_)) => {
                warn!(agent_id = %agent_id, "Control plane forgot this agent, re-registering next tick");
                self.identity = None;
                TickOutcome::Forgotten
            }
            Err(e) => {
                warn!(agent_id = %agent_id, error = %e, "Heartbeat failed");
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Delay before the tick following `outcome`.
    pub fn next_delay(&self, outcome: &TickOutcome) -> Duration {
        match outcome {
            TickOutcome::Failed(_) => self.config.retry_interval,
            _ => self.config.interval,
        }
    }

    /// Tick until `cancel` fires. The first tick runs immediately.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let outcome = self.tick().await;
            let delay = self.next_delay(&outcome);
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(name = %self.registration.name, "Heartbeat loop stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT_ID: &str = "9b2e4c1d-7a3f-4e5b-8c6d-0f1e2d3c4b5a";

    fn registration() -> RegistrationRequest {
        RegistrationRequest {
            name: "devops-engineer".to_string(),
            role: "devops_engineer".to_string(),
            version: "1.4.2".to_string(),
            capabilities: vec!["docker".to_string()],
            topics: vec![],
            health_url: "http://devops-engineer:8006/health".to_string(),
            dedup_key: "devops-engineer@node-1".to_string(),
        }
    }

    fn register_body() -> String {
        format!(r#"{{"id":"{}","created":true}}"#, AGENT_ID)
    }

    fn ack_body() -> String {
        format!(
            r#"{{"agent_id":"{}","status":"active","acknowledged_at":"2026-01-01T00:00:00Z"}}"#,
            AGENT_ID
        )
    }

    #[tokio::test]
    async fn test_register_then_heartbeat() {
        let mut server = mockito::Server::new_async().await;
        let register = server
            .mock("POST", "/agents/register")
            .with_status(201)
            .with_body(register_body())
            .expect(1)
            .create_async()
            .await;
        let heartbeat = server
            .mock("POST", "/agents/heartbeat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "agent_id": AGENT_ID,
                "status": "busy",
                "load": 0.75,
            })))
            .with_status(200)
            .with_body(ack_body())
            .expect(2)
            .create_async()
            .await;

        let mut hb = HeartbeatLoop::new(CrewplaneClient::new(server.url()), registration())
            .with_reporter(|| ("busy".to_string(), 0.75));
        assert!(matches!(hb.tick().await, TickOutcome::Registered(_)));
        assert_eq!(hb.tick().await, TickOutcome::Acknowledged);
        assert_eq!(hb.tick().await, TickOutcome::Acknowledged);

        register.assert_async().await;
        heartbeat.assert_async().await;
    }

    #[tokio::test]
    async fn test_404_clears_identity_and_reregisters_next_tick() {
        let mut server = mockito::Server::new_async().await;
        let register = server
            .mock("POST", "/agents/register")
            .with_status(200)
            .with_body(register_body())
            .expect(2)
            .create_async()
            .await;
        let _heartbeat = server
            .mock("POST", "/agents/heartbeat")
            .with_status(404)
            .create_async()
            .await;

        let mut hb = HeartbeatLoop::new(CrewplaneClient::new(server.url()), registration());
        hb.tick().await;
        assert!(hb.identity().is_some());

        let outcome = hb.tick().await;
        assert_eq!(outcome, TickOutcome::Forgotten);
        assert!(hb.identity().is_none());
        assert_eq!(hb.next_delay(&outcome), Duration::from_secs(10));

        assert!(matches!(hb.tick().await, TickOutcome::Registered(_)));
        register.assert_async().await;
    }

    #[tokio::test]
    async fn test_failure_shortens_next_delay() {
        let mut server = mockito::Server::new_async().await;
        let _register = server
            .mock("POST", "/agents/register")
            .with_status(503)
            .create_async()
            .await;

        let mut hb = HeartbeatLoop::new(CrewplaneClient::new(server.url()), registration());
        let outcome = hb.tick().await;
        assert!(matches!(outcome, TickOutcome::Failed(_)));
        assert_eq!(hb.next_delay(&outcome), Duration::from_secs(5));
        assert!(hb.identity().is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut server = mockito::Server::new_async().await;
        let _register = server
            .mock("POST", "/agents/register")
            .with_status(200)
            .with_body(register_body())
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        let hb = HeartbeatLoop::new(CrewplaneClient::new(server.url()), registration()).with_config(
            HeartbeatConfig {
                interval: Duration::from_secs(3600),
                retry_interval: Duration::from_secs(3600),
            },
        );
        let handle = tokio::spawn(hb.run(cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

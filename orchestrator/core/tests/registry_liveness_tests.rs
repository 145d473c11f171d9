// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Registry behaviour seen through the public API: idempotent upsert,
//! heartbeat recovery signal, liveness ageing and the watch stream.

use chrono::{Duration as ChronoDuration, Utc};
use crewplane_core::application::{AgentRegistry, StandardAgentRegistry};
use crewplane_core::domain::agent::{AgentStatus, Heartbeat, LivenessThresholds, RegistrationRequest};
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::RegistryEvent;
use crewplane_core::infrastructure::event_bus::EventBus;
use crewplane_core::infrastructure::repositories::InMemoryAgentRepository;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn registry() -> Arc<StandardAgentRegistry> {
    Arc::new(StandardAgentRegistry::new(
        Arc::new(InMemoryAgentRepository::new()),
        EventBus::new(64),
        LivenessThresholds::default(),
    ))
}

fn registration(capabilities: &[&str]) -> RegistrationRequest {
    RegistrationRequest {
        name: "qa-engineer".to_string(),
        role: "qa_engineer".to_string(),
        version: "2.1.0".to_string(),
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        topics: vec!["qa.results".to_string()],
        health_url: "http://qa-engineer:8005/health".to_string(),
        dedup_key: "qa-engineer@host-a".to_string(),
    }
}

fn heartbeat(agent_id: String) -> Heartbeat {
    Heartbeat {
        agent_id,
        status: "busy".to_string(),
        load: 0.4,
    }
}

#[tokio::test]
async fn test_same_dedup_key_yields_one_agent_with_latest_fields() {
    let registry = registry();
    let first = registry.register(registration(&["pytest"])).await.unwrap();
    let second = registry
        .register(registration(&["pytest", "playwright"]))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert!(first.created);
    assert!(!second.created);

    let agents = registry.list().await.unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].capabilities, vec!["pytest", "playwright"]);
}

#[tokio::test]
async fn test_concurrent_registrations_never_duplicate() {
    let registry = registry();
    let mut handles = Vec::new();
    for i in 0..16 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let caps = format!("cap-{}", i);
            registry.register(registration(&[caps.as_str()])).await.unwrap().id
        }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(registry.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_heartbeat_for_unknown_agent_is_not_found() {
    let registry = registry();
    let unknown = uuid::Uuid::new_v4().to_string();
    assert!(matches!(
        registry.heartbeat(heartbeat(unknown)).await,
        Err(ControlPlaneError::NotFound { kind: "agent", .. })
    ));
    assert!(matches!(
        registry.heartbeat(heartbeat("not-a-uuid".to_string())).await,
        Err(ControlPlaneError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_silent_agent_ages_and_heartbeat_revives_it() {
    let registry = registry();
    let receipt = registry.register(registration(&[])).await.unwrap();
    let now = Utc::now();

    assert_eq!(registry.sweep_stale(now + ChronoDuration::seconds(45)).await.unwrap(), 1);
    assert_eq!(registry.get(receipt.id).await.unwrap().status, AgentStatus::Stale);

    assert_eq!(registry.sweep_stale(now + ChronoDuration::seconds(45)).await.unwrap(), 0);

    assert_eq!(registry.sweep_stale(now + ChronoDuration::seconds(300)).await.unwrap(), 1);
    assert_eq!(registry.get(receipt.id).await.unwrap().status, AgentStatus::Offline);

    let ack = registry.heartbeat(heartbeat(receipt.id.to_string())).await.unwrap();
    assert_eq!(ack.status, AgentStatus::Active);
    let agent = registry.get(receipt.id).await.unwrap();
    assert_eq!(agent.reported_status.as_deref(), Some("busy"));
}

#[tokio::test]
async fn test_watch_streams_changes_after_subscription() {
    let registry = registry();
    let early = registry.register(registration(&[])).await.unwrap();

    let mut watch = registry.watch();
    registry.register(registration(&["k6"])).await.unwrap();
    registry
        .sweep_stale(Utc::now() + ChronoDuration::seconds(500))
        .await
        .unwrap();

    let first = timeout(Duration::from_millis(500), watch.next())
        .await
        .unwrap()
        .unwrap();
    match first {
        RegistryEvent::AgentUpdated { agent_id, .. } => assert_eq!(agent_id, early.id),
        other => panic!("unexpected {:?}", other),
    }

    match timeout(Duration::from_millis(500), watch.next()).await.unwrap().unwrap() {
        RegistryEvent::AgentStatusChanged { from, to, .. } => {
            assert_eq!(from, AgentStatus::Active);
            assert_eq!(to, AgentStatus::Offline);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_registration_is_rejected_with_field() {
    let registry = registry();
    let mut request = registration(&[]);
    request.version = "v2".to_string();
    match registry.register(request).await {
        Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "version"),
        other => panic!("unexpected {:?}", other),
    }

    let mut request = registration(&[]);
    request.dedup_key = String::new();
    match registry.register(request).await {
        Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "dedup_key"),
        other => panic!("unexpected {:?}", other),
    }
}

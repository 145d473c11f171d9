// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{Duration as ChronoDuration, Utc};
use crewplane_core::application::EventGateway;
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::PublishRequest;
use crewplane_core::domain::node_config::{AclPolicy, EventBusConfig, TopicAcl};
use crewplane_core::domain::repository::DedupStore;
use crewplane_core::infrastructure::event_bus::EventBus;
use crewplane_core::infrastructure::repositories::{InMemoryDedupStore, InMemoryPublisherHealthStore};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn publish(id: &str, publisher: &str, topic: &str) -> PublishRequest {
    PublishRequest {
        id: id.to_string(),
        topic: topic.to_string(),
        event_type: "artifact.ready".to_string(),
        payload: serde_json::json!({"path": "dist/app.tar"}),
        publisher: publisher.to_string(),
    }
}

#[tokio::test]
async fn test_deny_by_default_acl_only_admits_granted_publishers() {
    let config = EventBusConfig {
        acl: TopicAcl {
            default_policy: AclPolicy::Deny,
            topics: BTreeMap::from([("deploy.*".to_string(), vec!["devops_*".to_string()])]),
        },
        ..EventBusConfig::default()
    };
    let gateway = EventGateway::new(
        EventBus::new(16),
        Arc::new(InMemoryDedupStore::new()),
        Arc::new(InMemoryPublisherHealthStore::new()),
        config,
    );

    assert!(gateway
        .publish(publish("e1", "devops_engineer", "deploy.started"))
        .await
        .unwrap()
        .delivered);
    assert!(matches!(
        gateway.publish(publish("e2", "qa_engineer", "deploy.started")).await,
        Err(ControlPlaneError::Permission { .. })
    ));
    assert!(matches!(
        gateway.publish(publish("e3", "devops_engineer", "qa.results")).await,
        Err(ControlPlaneError::Permission { .. })
    ));
}

#[tokio::test]
async fn test_subscribers_only_see_their_topic() {
    let gateway = EventGateway::new(
        EventBus::new(16),
        Arc::new(InMemoryDedupStore::new()),
        Arc::new(InMemoryPublisherHealthStore::new()),
        EventBusConfig::default(),
    );
    let mut qa = gateway.subscribe("qa.results");

    let receipt = gateway.publish(publish("e1", "ci", "build.logs")).await.unwrap();
    assert_eq!(receipt.subscribers, 0);
    let receipt = gateway.publish(publish("e2", "ci", "qa.results")).await.unwrap();
    assert_eq!(receipt.subscribers, 1);

    let envelope = timeout(Duration::from_millis(500), qa.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(envelope.id, "e2");
    assert_eq!(envelope.publisher, "ci");
}

#[tokio::test]
async fn test_dedup_window_expiry_allows_redelivery() {
    let store = InMemoryDedupStore::new();
    let ttl = ChronoDuration::minutes(10);
    let now = Utc::now();

    assert!(store.first_seen("evt-9", ttl, now).await.unwrap());
    assert!(!store.first_seen("evt-9", ttl, now + ChronoDuration::minutes(9)).await.unwrap());
    assert!(store.first_seen("evt-9", ttl, now + ChronoDuration::minutes(11)).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_duplicates_claim_once() {
    let store = Arc::new(InMemoryDedupStore::new());
    let now = Utc::now();
    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .first_seen("evt-shared", ChronoDuration::minutes(10), now)
                .await
                .unwrap()
        }));
    }
    let mut claimed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            claimed += 1;
        }
    }
    assert_eq!(claimed, 1);
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Event Gateway
//!
//! Agent-facing publish/subscribe on top of [`EventBus`] topics. A publish
//! passes, in order: topic ACL, publisher circuit breaker, event-id dedup.
//! Only then is the envelope handed to the topic's subscribers.
//!
//! Dedup and breaker state live in the injected stores so a PostgreSQL
//! backend shares them across control-plane instances. [`run_purger`] keeps
//! the dedup window and the topic table from growing without bound.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::error::ControlPlaneError;
use crate::domain::events::{EventEnvelope, PublishReceipt, PublishRequest, PublisherHealth};
use crate::domain::node_config::EventBusConfig;
use crate::domain::repository::{DedupStore, PublisherHealthStore};
use crate::infrastructure::event_bus::EventBus;

pub struct EventGateway {
    bus: EventBus,
    dedup: Arc<dyn DedupStore>,
    health: Arc<dyn PublisherHealthStore>,
    config: EventBusConfig,
}

impl EventGateway {
    pub fn new(
        bus: EventBus,
        dedup: Arc<dyn DedupStore>,
        health: Arc<dyn PublisherHealthStore>,
        config: EventBusConfig,
    ) -> Self {
        Self {
            bus,
            dedup,
            health,
            config,
        }
    }

    pub async fn publish(&self, request: PublishRequest) -> Result<PublishReceipt, ControlPlaneError> {
        request.validate()?;

        if !self.config.acl.permits(&request.publisher, &request.topic) {
            metrics::counter!("crewplane_events_rejected_total", "reason" => "acl").increment(1);
            warn!(publisher = %request.publisher, topic = %request.topic, "Publish denied by topic ACL");
            return Err(ControlPlaneError::Permission {
                publisher: request.publisher,
                topic: request.topic,
            });
        }

        if let Some(health) = self.health.get(&request.publisher).await? {
            if health.paused {
                metrics::counter!("crewplane_events_rejected_total", "reason" => "circuit_open")
                    .increment(1);
                return Err(ControlPlaneError::Backpressure {
                    publisher: health.publisher_id,
                    consecutive_failures: health.consecutive_failures,
                });
            }
        }

        let now = Utc::now();
        if !self
            .dedup
            .first_seen(&request.id, self.config.dedup_window(), now)
            .await?
        {
            metrics::counter!("crewplane_events_deduplicated_total").increment(1);
            debug!(event_id = %request.id, topic = %request.topic, "Duplicate event suppressed");
            return Ok(PublishReceipt {
                event_id: request.id,
                delivered: false,
                subscribers: 0,
            });
        }

        let event_id = request.id.clone();
        let subscribers = self.bus.publish_to_topic(request.into_envelope(now));
        metrics::counter!("crewplane_events_published_total").increment(1);

        Ok(PublishReceipt {
            event_id,
            delivered: true,
            subscribers,
        })
    }

    /// Envelopes published on `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> BoxStream<'static, EventEnvelope> {
        let topic_name = topic.to_string();
        BroadcastStream::new(self.bus.subscribe_topic(topic))
            .filter_map(move |item| {
                let topic_name = topic_name.clone();
                async move {
                    match item {
                        Ok(envelope) => Some(envelope),
                        Err(e) => {
                            warn!(topic = %topic_name, "Topic subscriber skipped events: {}", e);
                            None
                        }
                    }
                }
            })
            .boxed()
    }

    pub async fn report_health(
        &self,
        publisher: &str,
        success: bool,
    ) -> Result<PublisherHealth, ControlPlaneError> {
        if publisher.trim().is_empty() {
            return Err(ControlPlaneError::validation("publisher", "must not be empty"));
        }
        let before = self.health.get(publisher).await?.map(|h| h.paused).unwrap_or(false);
        let health = self
            .health
            .record(publisher, success, self.config.failure_threshold)
            .await?;

        if health.paused && !before {
            warn!(
                publisher = %publisher,
                failures = health.consecutive_failures,
                "Publisher circuit opened"
            );
        } else if !health.paused && before {
            info!(publisher = %publisher, "Publisher circuit closed");
        }
        Ok(health)
    }

    pub async fn publisher_health(
        &self,
        publisher: &str,
    ) -> Result<Option<PublisherHealth>, ControlPlaneError> {
        Ok(self.health.get(publisher).await?)
    }

    /// Drop dedup claims that expired by `now` and topic channels nobody
    /// subscribes to any more.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, ControlPlaneError> {
        let dedup_claims = self.dedup.purge_expired(now).await?;
        let idle_topics = self.bus.prune_idle_topics();
        if dedup_claims > 0 || idle_topics > 0 {
            metrics::counter!("crewplane_dedup_claims_purged_total").increment(dedup_claims);
            debug!(dedup_claims, idle_topics, "Purged event bus state");
        }
        Ok(PurgeReport {
            dedup_claims,
            idle_topics,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub dedup_claims: u64,
    pub idle_topics: usize,
}

/// Run `purge_expired` every `interval` until `cancel` fires.
pub async fn run_purger(gateway: Arc<EventGateway>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Event bus purger stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = gateway.purge_expired(Utc::now()).await {
                    warn!("Event bus purge failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::node_config::{AclPolicy, TopicAcl};
    use crate::infrastructure::repositories::{InMemoryDedupStore, InMemoryPublisherHealthStore};
    use std::collections::BTreeMap;

    fn gateway(config: EventBusConfig) -> EventGateway {
        EventGateway::new(
            EventBus::new(16),
            Arc::new(InMemoryDedupStore::new()),
            Arc::new(InMemoryPublisherHealthStore::new()),
            config,
        )
    }

    fn request(id: &str, publisher: &str, topic: &str) -> PublishRequest {
        PublishRequest {
            id: id.to_string(),
            topic: topic.to_string(),
            event_type: "status".to_string(),
            payload: serde_json::json!({"ok": true}),
            publisher: publisher.to_string(),
        }
    }

    #[tokio::test]
    async fn test_repeated_event_id_is_delivered_once() {
        let gateway = gateway(EventBusConfig::default());
        let mut subscriber = gateway.subscribe("agent.events");

        for _ in 0..5 {
            gateway
                .publish(request("evt-1", "qa-engineer", "agent.events"))
                .await
                .unwrap();
        }
        gateway
            .publish(request("evt-2", "qa-engineer", "agent.events"))
            .await
            .unwrap();

        assert_eq!(subscriber.next().await.unwrap().id, "evt-1");
        assert_eq!(subscriber.next().await.unwrap().id, "evt-2");
    }

    #[tokio::test]
    async fn test_duplicate_publish_reports_not_delivered() {
        let gateway = gateway(EventBusConfig::default());
        let first = gateway.publish(request("evt-1", "qa", "t")).await.unwrap();
        let second = gateway.publish(request("evt-1", "qa", "t")).await.unwrap();
        assert!(first.delivered);
        assert!(!second.delivered);
    }

    #[tokio::test]
    async fn test_acl_violation_is_permission_error() {
        let config = EventBusConfig {
            acl: TopicAcl {
                default_policy: AclPolicy::Allow,
                topics: BTreeMap::from([(
                    "phase.*".to_string(),
                    vec!["broski_orchestrator".to_string()],
                )]),
            },
            ..EventBusConfig::default()
        };
        let gateway = gateway(config);
        match gateway.publish(request("evt-1", "frontend", "phase.changes")).await {
            Err(ControlPlaneError::Permission { publisher, topic }) => {
                assert_eq!(publisher, "frontend");
                assert_eq!(topic, "phase.changes");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_circuit_opens_after_three_failures_and_closes_on_success() {
        let gateway = gateway(EventBusConfig::default());
        for _ in 0..2 {
            gateway.report_health("coder", false).await.unwrap();
        }
        assert!(gateway.publish(request("e1", "coder", "t")).await.is_ok());

        gateway.report_health("coder", false).await.unwrap();
        match gateway.publish(request("e2", "coder", "t")).await {
            Err(ControlPlaneError::Backpressure {
                consecutive_failures,
                ..
            }) => assert_eq!(consecutive_failures, 3),
            other => panic!("unexpected {:?}", other),
        }

        gateway.report_health("coder", true).await.unwrap();
        assert!(gateway.publish(request("e2", "coder", "t")).await.unwrap().delivered);
    }

    #[tokio::test]
    async fn test_expired_claims_are_purged() {
        let gateway = gateway(EventBusConfig {
            dedup_ttl: Duration::from_millis(1),
            ..EventBusConfig::default()
        });
        for i in 0..1000 {
            gateway
                .publish(request(&format!("evt-{}", i), "qa", "agent.events"))
                .await
                .unwrap();
        }
        let later = Utc::now() + chrono::Duration::seconds(1);
        let report = gateway.purge_expired(later).await.unwrap();
        assert_eq!(report.dedup_claims, 1000);
        assert_eq!(gateway.purge_expired(later).await.unwrap().dedup_claims, 0);
    }

    #[tokio::test]
    async fn test_live_claims_survive_a_purge() {
        let gateway = gateway(EventBusConfig::default());
        gateway.publish(request("evt-1", "qa", "t")).await.unwrap();
        assert_eq!(gateway.purge_expired(Utc::now()).await.unwrap().dedup_claims, 0);
        assert!(!gateway.publish(request("evt-1", "qa", "t")).await.unwrap().delivered);
    }

    #[tokio::test]
    async fn test_dropped_subscriptions_release_their_topic() {
        let gateway = gateway(EventBusConfig::default());
        let kept = gateway.subscribe("deploy.events");
        drop(gateway.subscribe("agent.events"));

        let report = gateway.purge_expired(Utc::now()).await.unwrap();
        assert_eq!(report.idle_topics, 1);
        drop(kept);
        assert_eq!(gateway.purge_expired(Utc::now()).await.unwrap().idle_topics, 1);
    }

    #[tokio::test]
    async fn test_purger_stops_on_cancel() {
        let gateway = Arc::new(gateway(EventBusConfig::default()));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_purger(gateway, Duration::from_millis(10), cancel.clone()));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_publish_does_not_burn_the_event_id() {
        let gateway = gateway(EventBusConfig::default());
        for _ in 0..3 {
            gateway.report_health("coder", false).await.unwrap();
        }
        assert!(gateway.publish(request("e1", "coder", "t")).await.is_err());
        gateway.report_health("coder", true).await.unwrap();
        assert!(gateway.publish(request("e1", "coder", "t")).await.unwrap().delivered);
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Event Bus Implementation - Pub/Sub for Domain Events and Agent Topics
//
// Two kinds of traffic share this bus:
// - DomainEvent: control-plane state changes (registry, phase, handoff, task),
//   fanned out on one broadcast channel.
// - EventEnvelope: agent-published events, one broadcast channel per topic.
//   A topic channel exists only while someone subscribes to it; publishing to
//   a topic nobody listens on delivers to no one and allocates nothing.
//
// In-memory only: a subscriber sees what is published after it subscribed,
// nothing earlier.

use crate::domain::events::{EventEnvelope, HandoffEvent, PhaseEvent, RegistryEvent, TaskEvent};
use dashmap::DashMap;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Registry(RegistryEvent),
    Phase(PhaseEvent),
    Handoff(HandoffEvent),
    Task(TaskEvent),
}

/// Event bus for publishing and subscribing to domain events and topics
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
    topics: Arc<DashMap<String, broadcast::Sender<EventEnvelope>>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus; `capacity` bounds every channel's buffer
    /// before slow receivers start lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
            topics: Arc::new(DashMap::new()),
            capacity,
        }
    }

    pub fn publish_registry_event(&self, event: RegistryEvent) {
        self.publish(DomainEvent::Registry(event));
    }

    pub fn publish_phase_event(&self, event: PhaseEvent) {
        self.publish(DomainEvent::Phase(event));
    }

    pub fn publish_handoff_event(&self, event: HandoffEvent) {
        self.publish(DomainEvent::Handoff(event));
    }

    pub fn publish_task_event(&self, event: TaskEvent) {
        self.publish(DomainEvent::Task(event));
    }

    fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all domain events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Deliver an envelope to the current subscribers of its topic.
    /// Returns how many receivers got it.
    pub fn publish_to_topic(&self, envelope: EventEnvelope) -> usize {
        let topic = envelope.topic.clone();
        let delivered = self
            .topics
            .get(&topic)
            .map(|sender| sender.send(envelope).unwrap_or(0))
            .unwrap_or(0);
        debug!(topic = %topic, subscribers = delivered, "Delivered topic event");
        delivered
    }

    pub fn subscribe_topic(&self, topic: &str) -> broadcast::Receiver<EventEnvelope> {
        // Subscribing under the entry guard keeps a concurrent prune from
        // dropping the sender between lookup and subscribe.
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop topic channels whose subscribers have all gone away.
    /// Returns how many were removed.
    pub fn prune_idle_topics(&self) -> usize {
        let before = self.topics.len();
        self.topics.retain(|_, sender| sender.receiver_count() > 0);
        before.saturating_sub(self.topics.len())
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => EventBusError::Closed,
            broadcast::error::RecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }

    /// Adapt into a stream that skips over lag instead of ending.
    pub fn into_stream(self) -> BoxStream<'static, DomainEvent> {
        BroadcastStream::new(self.receiver)
            .filter_map(|item| async move {
                match item {
                    Ok(event) => Some(event),
                    Err(BroadcastStreamRecvError::Lagged(n)) => {
                        warn!("Event stream lagged by {} events", n);
                        None
                    }
                }
            })
            .boxed()
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent::{AgentId, AgentStatus};
    use crate::domain::phase::ProjectPhase;
    use chrono::Utc;

    fn envelope(id: &str, topic: &str) -> EventEnvelope {
        EventEnvelope {
            id: id.to_string(),
            topic: topic.to_string(),
            event_type: "test".to_string(),
            payload: serde_json::json!({}),
            publisher: "tester".to_string(),
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let event_bus = EventBus::new(10);
        let mut receiver = event_bus.subscribe();

        let agent_id = AgentId::new();
        event_bus.publish_registry_event(RegistryEvent::AgentStatusChanged {
            agent_id,
            name: "qa".to_string(),
            from: AgentStatus::Active,
            to: AgentStatus::Stale,
            changed_at: Utc::now(),
        });

        match receiver.recv().await.unwrap() {
            DomainEvent::Registry(RegistryEvent::AgentStatusChanged { agent_id: id, .. }) => {
                assert_eq!(id, agent_id)
            }
            other => panic!("Wrong event type received: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_keeps_publish_order() {
        let event_bus = EventBus::new(10);
        let mut stream = event_bus.subscribe().into_stream();

        event_bus.publish_phase_event(PhaseEvent::PhaseActivated {
            from: ProjectPhase::Planning,
            to: ProjectPhase::Architecture,
            forced: false,
            gate_status: None,
            activated_at: Utc::now(),
        });
        event_bus.publish_registry_event(RegistryEvent::AgentUpdated {
            agent_id: AgentId::new(),
            name: "qa".to_string(),
            role: "qa_engineer".to_string(),
            updated_at: Utc::now(),
        });

        assert!(matches!(stream.next().await, Some(DomainEvent::Phase(_))));
        assert!(matches!(stream.next().await, Some(DomainEvent::Registry(_))));
    }

    #[tokio::test]
    async fn test_lagging_stream_skips_ahead() {
        let event_bus = EventBus::new(2);
        let mut stream = event_bus.subscribe().into_stream();
        for _ in 0..5 {
            event_bus.publish_registry_event(RegistryEvent::AgentUpdated {
                agent_id: AgentId::new(),
                name: "qa".to_string(),
                role: "qa_engineer".to_string(),
                updated_at: Utc::now(),
            });
        }
        assert!(matches!(stream.next().await, Some(DomainEvent::Registry(_))));
    }

    #[tokio::test]
    async fn test_no_replay_before_subscription() {
        let event_bus = EventBus::new(10);
        event_bus.publish_to_topic(envelope("early", "agent.events"));

        let mut receiver = event_bus.subscribe_topic("agent.events");
        event_bus.publish_to_topic(envelope("late", "agent.events"));

        assert_eq!(receiver.recv().await.unwrap().id, "late");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let event_bus = EventBus::new(10);
        let mut deploys = event_bus.subscribe_topic("deploy.events");
        assert_eq!(event_bus.publish_to_topic(envelope("a", "agent.events")), 0);
        assert_eq!(event_bus.publish_to_topic(envelope("b", "deploy.events")), 1);
        assert_eq!(deploys.recv().await.unwrap().id, "b");
    }

    #[test]
    fn test_publishing_to_unheard_topics_allocates_nothing() {
        let event_bus = EventBus::new(10);
        for i in 0..100 {
            event_bus.publish_to_topic(envelope("e", &format!("topic.{}", i)));
        }
        assert_eq!(event_bus.topic_count(), 0);
    }

    #[test]
    fn test_idle_topics_are_pruned() {
        let event_bus = EventBus::new(10);
        let kept = event_bus.subscribe_topic("deploy.events");
        drop(event_bus.subscribe_topic("agent.events"));
        assert_eq!(event_bus.topic_count(), 2);

        assert_eq!(event_bus.prune_idle_topics(), 1);
        assert_eq!(event_bus.topic_count(), 1);
        assert_eq!(event_bus.publish_to_topic(envelope("x", "deploy.events")), 1);
        drop(kept);
        assert_eq!(event_bus.prune_idle_topics(), 1);
        assert_eq!(event_bus.topic_count(), 0);
    }
}

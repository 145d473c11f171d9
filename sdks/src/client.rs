// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::types::{
    HandoffOutcome, HandoffRequest, HealthReport, Heartbeat, HeartbeatAck, PublishReceipt,
    PublishRequest, PublisherHealth, RegistrationReceipt, RegistrationRequest,
};

const REGISTER_TIMEOUT: Duration = Duration::from_secs(10);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    /// The control plane does not know this agent id; register again.
    #[error("control plane does not know agent '{0}'")]
    UnknownAgent(String),

    #[error("control plane rejected the request with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid control plane URL '{0}'")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client for a crewplane control plane.
///
/// Every call carries its own timeout and is attempted once; retrying is the
/// caller's decision (see [`HeartbeatLoop`](crate::HeartbeatLoop)).
#[derive(Debug, Clone)]
pub struct CrewplaneClient {
    base_url: String,
    client: Client,
}

impl CrewplaneClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` extended by `segments`, each percent-encoded as one path
    /// segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Register or refresh this agent. Idempotent on `dedup_key`.
    pub async fn register(
        &self,
        request: &RegistrationRequest,
    ) -> Result<RegistrationReceipt, ClientError> {
        let req = self
            .client
            .post(self.endpoint(&["agents", "register"])?)
            .json(request)
            .timeout(REGISTER_TIMEOUT);
        send(req).await
    }

    /// Send one heartbeat. A 404 becomes [`ClientError::UnknownAgent`].
    pub async fn heartbeat(&self, heartbeat: &Heartbeat) -> Result<HeartbeatAck, ClientError> {
        let response = self
            .client
            .post(self.endpoint(&["agents", "heartbeat"])?)
            .json(heartbeat)
            .timeout(HEARTBEAT_TIMEOUT)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::UnknownAgent(heartbeat.agent_id.clone()));
        }
        decode(response).await
    }

    pub async fn handoff(&self, request: &HandoffRequest) -> Result<HandoffOutcome, ClientError> {
        let req = self
            .client
            .post(self.endpoint(&["handoff"])?)
            .json(request)
            .timeout(REQUEST_TIMEOUT);
        send(req).await
    }

    /// Publish an event. Retrying with the same `id` is safe: the bus
    /// suppresses the duplicate and answers `delivered: false`.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt, ClientError> {
        let req = self
            .client
            .post(self.endpoint(&["events"])?)
            .json(request)
            .timeout(REQUEST_TIMEOUT);
        send(req).await
    }

    pub async fn report_health(
        &self,
        publisher: &str,
        success: bool,
    ) -> Result<PublisherHealth, ClientError> {
        let req = self
            .client
            .post(self.endpoint(&["events", "publishers", publisher, "health"])?)
            .json(&HealthReport { success })
            .timeout(REQUEST_TIMEOUT);
        send(req).await
    }
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    decode(request.send().await?).await
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_heartbeat_404_is_unknown_agent() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/agents/heartbeat")
            .with_status(404)
            .with_body(r#"{"error":"not_found"}"#)
            .create_async()
            .await;

        let client = CrewplaneClient::new(server.url());
        let err = client
            .heartbeat(&Heartbeat {
                agent_id: "4f1c7e0a-0000-4000-8000-000000000001".to_string(),
                status: "active".to_string(),
                load: 0.0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownAgent(id) if id.ends_with("0001")));
    }

    #[tokio::test]
    async fn test_backpressure_is_surfaced_as_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/events")
            .match_body(Matcher::PartialJson(json!({"id": "evt-1", "type": "build.done"})))
            .with_status(429)
            .with_body(r#"{"error":"backpressure"}"#)
            .create_async()
            .await;

        let client = CrewplaneClient::new(format!("{}/", server.url()));
        let err = client
            .publish(&PublishRequest {
                id: "evt-1".to_string(),
                topic: "ci".to_string(),
                event_type: "build.done".to_string(),
                payload: json!({}),
                publisher: "devops_engineer".to_string(),
            })
            .await
            .unwrap_err();
        match err {
            ClientError::Rejected { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("backpressure"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handoff_decodes_outcome() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/handoff")
            .with_status(200)
            .with_body(r#"{"status":"queued","task_id":"t1","target":"devops_engineer","reason":"not in crew"}"#)
            .create_async()
            .await;

        let client = CrewplaneClient::new(server.url());
        let outcome = client
            .handoff(&HandoffRequest {
                source_agent: "backend_specialist".to_string(),
                target_agent: "devops_engineer".to_string(),
                task_id: "t1".to_string(),
                context: json!({}),
                artifacts: vec![],
            })
            .await
            .unwrap();
        assert_eq!(outcome.as_str(), "queued");
    }

    #[tokio::test]
    async fn test_report_health_posts_success_flag() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/events/publishers/coder/health")
            .match_body(Matcher::Json(json!({"success": false})))
            .with_status(200)
            .with_body(r#"{"publisher_id":"coder","consecutive_failures":1,"paused":false,"updated_at":"2026-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = CrewplaneClient::new(server.url());
        let health = client.report_health("coder", false).await.unwrap();
        assert_eq!(health.consecutive_failures, 1);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_publisher_id_is_one_encoded_path_segment() {
        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("POST", "/events/publishers/ci%20bot%2F1/health")
            .with_status(200)
            .with_body(r#"{"publisher_id":"ci bot/1","consecutive_failures":0,"paused":false,"updated_at":"2026-01-01T00:00:00Z"}"#)
            .create_async()
            .await;

        let client = CrewplaneClient::new(server.url());
        let health = client.report_health("ci bot/1", true).await.unwrap();
        assert_eq!(health.publisher_id, "ci bot/1");
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_reported() {
        let client = CrewplaneClient::new("not a url");
        assert!(matches!(
            client.report_health("coder", true).await,
            Err(ClientError::InvalidUrl(_))
        ));
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for communicating with the daemon API

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio_stream::StreamExt;

use crewplane_core::domain::agent::AgentDescriptor;
use crewplane_core::domain::events::{PublishReceipt, PublishRequest};
use crewplane_core::domain::handoff::{HandoffLogEntry, HandoffOutcome, HandoffRequest, QueuedHandoff};
use crewplane_core::domain::task::TaskRecord;
use crewplane_core::domain::validation::{ProjectState, ValidationReport};
use crewplane_core::domain::workflow::{WorkflowReceipt, WorkflowRecord, WorkflowRequest};
use crewplane_swarm::application::{PlanReceipt, PlanRequest};
use crewplane_swarm::{CrewSnapshot, PhaseChange};

use super::base_url;

#[derive(Debug, Clone)]
pub struct DaemonClient {
    client: Client,
    base_url: String,
}

impl DaemonClient {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder()
            // No global timeout: watch streams are long-lived
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url(host, port),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<Value> {
        self.get("/health", "Failed to query daemon health").await
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentDescriptor>> {
        self.get("/agents", "Failed to list agents").await
    }

    /// Live `/status` poll of every known agent.
    pub async fn agent_status(&self) -> Result<serde_json::Map<String, Value>> {
        self.get("/agents/status", "Failed to poll agent status").await
    }

    pub async fn execute_agent(&self, agent: &str, payload: Value) -> Result<Value> {
        self.post(
            &format!("/agent/{}/execute", agent),
            &payload,
            "Failed to execute agent",
        )
        .await
    }

    pub async fn set_phase(&self, phase: &str, force: bool) -> Result<PhaseChange> {
        let path = if force {
            format!("/phase/{}?force=true", phase)
        } else {
            format!("/phase/{}", phase)
        };
        self.post(&path, &json!({}), "Failed to change phase").await
    }

    pub async fn validate_transition(&self, target: &str) -> Result<ValidationReport> {
        let response = self
            .client
            .get(format!("{}/validate-transition", self.base_url))
            .query(&[("target_phase", target)])
            .send()
            .await
            .context("Failed to validate transition")?;
        parse(response, "Failed to validate transition").await
    }

    pub async fn crew(&self) -> Result<CrewSnapshot> {
        self.get("/crew", "Failed to get active crew").await
    }

    pub async fn facts(&self) -> Result<ProjectState> {
        self.get("/project/facts", "Failed to get project facts").await
    }

    pub async fn record_fact(&self, key: &str, value: Value) -> Result<ProjectState> {
        self.post(
            "/project/facts",
            &json!({"key": key, "value": value}),
            "Failed to record project fact",
        )
        .await
    }

    pub async fn plan(&self, task: &str, context: Value) -> Result<PlanReceipt> {
        let request = PlanRequest {
            task: task.to_string(),
            context,
        };
        self.post("/plan", &request, "Failed to submit task").await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<TaskRecord> {
        self.get(&format!("/task/{}", task_id), "Failed to get task")
            .await
    }

    pub async fn start_workflow(&self, workflow_type: &str, description: &str) -> Result<WorkflowReceipt> {
        let request = WorkflowRequest {
            description: description.to_string(),
        };
        self.post(
            &format!("/workflow/{}", workflow_type),
            &request,
            "Failed to start workflow",
        )
        .await
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Result<WorkflowRecord> {
        self.get(&format!("/workflows/{}", workflow_id), "Failed to get workflow")
            .await
    }

    pub async fn task_handoffs(&self, task_id: &str) -> Result<Vec<HandoffLogEntry>> {
        self.get(
            &format!("/task/{}/handoffs", task_id),
            "Failed to get handoff history",
        )
        .await
    }

    pub async fn handoff(&self, request: &HandoffRequest) -> Result<HandoffOutcome> {
        self.post("/handoff", request, "Failed to hand off task").await
    }

    pub async fn queued_handoffs(&self) -> Result<Vec<QueuedHandoff>> {
        self.get("/handoffs/queued", "Failed to list queued handoffs")
            .await
    }

    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishReceipt> {
        self.post("/events", request, "Failed to publish event").await
    }

    /// Print each server-sent event of `path` until the stream ends.
    pub async fn stream(&self, path: &str, mut on_event: impl FnMut(&str, Value)) -> Result<()> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .context("Failed to connect to event stream")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Failed to open event stream: {}", error_text);
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut event_name = String::from("message");

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read event stream chunk")?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                let line = line.trim_end();
                if let Some(name) = line.strip_prefix("event:") {
                    event_name = name.trim().to_string();
                } else if let Some(data) = line.strip_prefix("data:") {
                    if let Ok(value) = serde_json::from_str::<Value>(data.trim()) {
                        on_event(&event_name, value);
                    }
                } else if line.is_empty() {
                    event_name = String::from("message");
                }
            }
        }

        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &'static str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .context(what)?;
        parse(response, what).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &'static str,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .context(what)?;
        parse(response, what).await
    }
}

async fn parse<T: DeserializeOwned>(response: Response, what: &'static str) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["message"].as_str().map(str::to_string))
            .unwrap_or(error_text);
        anyhow::bail!("{}: HTTP {}: {}", what, status.as_u16(), message);
    }
    response
        .json()
        .await
        .with_context(|| format!("{}: unexpected response body", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> DaemonClient {
        DaemonClient {
            client: Client::new(),
            base_url: server.url(),
        }
    }

    #[tokio::test]
    async fn test_forced_phase_change_sets_query() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/phase/deployment")
            .match_query(Matcher::UrlEncoded("force".into(), "true".into()))
            .with_body(
                json!({
                    "phase": "deployment",
                    "previous_phase": "development",
                    "active_agents": ["devops_engineer"],
                    "gatekeeper": "devops_engineer",
                    "forced": true
                })
                .to_string(),
            )
            .create_async()
            .await;

        let change = client_for(&server).set_phase("deployment", true).await.unwrap();
        assert!(change.forced);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_start_workflow_posts_the_description() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/workflow/bugfix")
            .match_body(Matcher::Json(json!({"description": "login loop on Safari"})))
            .with_body(
                json!({
                    "workflow_id": "workflow_bugfix_20260101_120000_0a1b2c3d",
                    "type": "bugfix",
                    "agents": ["project_strategist", "qa_engineer", "backend_specialist", "frontend_specialist"],
                    "status": "initiated"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let receipt = client_for(&server)
            .start_workflow("bugfix", "login loop on Safari")
            .await
            .unwrap();
        assert_eq!(receipt.agents.len(), 4);
        assert_eq!(receipt.workflow_id, "workflow_bugfix_20260101_120000_0a1b2c3d");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_message_is_surfaced() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/task/missing")
            .with_status(404)
            .with_body(r#"{"error":"not_found","message":"task 'missing' not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server).get_task("missing").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("404"), "{}", text);
        assert!(text.contains("task 'missing' not found"), "{}", text);
    }

    #[tokio::test]
    async fn test_stream_parses_named_events() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/events/deploy.status")
            .with_header("content-type", "text/event-stream")
            .with_body("event: envelope\ndata: {\"id\":\"e1\"}\n\n: keep-alive\n\nevent: envelope\ndata: {\"id\":\"e2\"}\n\n")
            .create_async()
            .await;

        let mut seen = Vec::new();
        client_for(&server)
            .stream("/events/deploy.status", |name, value| {
                seen.push((name.to_string(), value["id"].as_str().unwrap_or_default().to_string()))
            })
            .await
            .unwrap();
        assert_eq!(
            seen,
            vec![
                ("envelope".to_string(), "e1".to_string()),
                ("envelope".to_string(), "e2".to_string())
            ]
        );
    }
}

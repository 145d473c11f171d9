// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Worker Agent HTTP Client
//!
//! Outbound calls from the control plane to worker agents. Every agent
//! exposes `GET /health`, `GET /status` and `POST /execute`; the strategist
//! additionally exposes `POST /plan`.
//!
//! Every request carries an explicit timeout and none is retried here: the
//! next heartbeat, sweep or poll re-evaluates a failed agent.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::error::ControlPlaneError;

#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Synchronous execute proxy; waits for the agent's answer.
    async fn execute(&self, agent: &str, base_url: &str, payload: &Value)
        -> Result<Value, ControlPlaneError>;

    /// Fire a handoff dispatch at the agent's execute endpoint.
    async fn dispatch(&self, agent: &str, base_url: &str, payload: &Value)
        -> Result<(), ControlPlaneError>;

    async fn status(&self, agent: &str, base_url: &str) -> Result<Value, ControlPlaneError>;

    async fn plan(&self, agent: &str, base_url: &str, payload: &Value)
        -> Result<Value, ControlPlaneError>;
}

pub struct HttpAgentClient {
    client: Client,
    request_timeout: Duration,
    execute_timeout: Duration,
}

impl HttpAgentClient {
    pub fn new(request_timeout: Duration, execute_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            request_timeout,
            execute_timeout,
        }
    }

    async fn post_json(
        &self,
        agent: &str,
        url: String,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value, ControlPlaneError> {
        debug!(agent = %agent, url = %url, "POST to agent");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| unreachable(agent, e))?;
        read_json(agent, response).await
    }
}

fn unreachable(agent: &str, err: reqwest::Error) -> ControlPlaneError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ControlPlaneError::Unreachable {
        agent: agent.to_string(),
        reason,
    }
}

async fn read_json(agent: &str, response: reqwest::Response) -> Result<Value, ControlPlaneError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ControlPlaneError::Unreachable {
            agent: agent.to_string(),
            reason: format!("agent responded with {}: {}", status, body),
        });
    }
    response.json::<Value>().await.map_err(|e| unreachable(agent, e))
}

#[async_trait]
impl AgentClient for HttpAgentClient {
    async fn execute(
        &self,
        agent: &str,
        base_url: &str,
        payload: &Value,
    ) -> Result<Value, ControlPlaneError> {
        self.post_json(agent, format!("{}/execute", base_url), payload, self.execute_timeout)
            .await
    }

    async fn dispatch(
        &self,
        agent: &str,
        base_url: &str,
        payload: &Value,
    ) -> Result<(), ControlPlaneError> {
        self.post_json(agent, format!("{}/execute", base_url), payload, self.request_timeout)
            .await
            .map(|_| ())
    }

    async fn status(&self, agent: &str, base_url: &str) -> Result<Value, ControlPlaneError> {
        let response = self
            .client
            .get(format!("{}/status", base_url))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| unreachable(agent, e))?;
        read_json(agent, response).await
    }

    async fn plan(
        &self,
        agent: &str,
        base_url: &str,
        payload: &Value,
    ) -> Result<Value, ControlPlaneError> {
        self.post_json(agent, format!("{}/plan", base_url), payload, self.execute_timeout)
            .await
    }
}

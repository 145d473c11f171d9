// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crewplane::daemon::api::build_router;
use crewplane::daemon::state::AppState;
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::node_config::ControlPlaneSpec;
use crewplane_core::infrastructure::agent_client::AgentClient;
use crewplane_core::infrastructure::repositories::RepositorySet;

/// Answers every call; agents listed in `down` are unreachable.
#[derive(Default)]
struct StubAgents {
    down: Vec<String>,
    dispatched: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl AgentClient for StubAgents {
    async fn execute(&self, agent: &str, _base_url: &str, payload: &Value) -> Result<Value, ControlPlaneError> {
        self.check(agent)?;
        Ok(json!({"agent": agent, "echo": payload}))
    }

    async fn dispatch(&self, agent: &str, _base_url: &str, payload: &Value) -> Result<(), ControlPlaneError> {
        self.check(agent)?;
        self.dispatched.lock().push((agent.to_string(), payload.clone()));
        Ok(())
    }

    async fn status(&self, agent: &str, _base_url: &str) -> Result<Value, ControlPlaneError> {
        self.check(agent)?;
        Ok(json!({"agent": agent, "status": "idle"}))
    }

    async fn plan(&self, agent: &str, _base_url: &str, _payload: &Value) -> Result<Value, ControlPlaneError> {
        self.check(agent)?;
        Ok(json!({"steps": ["design", "build"]}))
    }
}

impl StubAgents {
    fn check(&self, agent: &str) -> Result<(), ControlPlaneError> {
        if self.down.iter().any(|d| d == agent) {
            return Err(ControlPlaneError::Unreachable {
                agent: agent.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

fn app_with(agents: StubAgents) -> Router {
    let state = AppState::build(
        RepositorySet::in_memory(),
        "in-memory",
        &ControlPlaneSpec::default(),
        Arc::new(agents),
    )
    .unwrap();
    build_router(state)
}

fn app() -> Router {
    app_with(StubAgents::default())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn registration(name: &str, role: &str) -> Value {
    json!({
        "name": name,
        "role": role,
        "version": "1.2.0",
        "capabilities": ["review"],
        "topics": ["agent.events"],
        "health_url": format!("http://{}:9000/health", name),
        "dedup_key": format!("{}-key", name),
    })
}

#[tokio::test]
async fn test_health_reports_phase_and_store() {
    let app = app();
    let (status, body) = call(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "ok");
    assert_eq!(body["storage_backend"], "in-memory");
    assert_eq!(body["phase"], "planning");
    assert_eq!(body["active_crew"]["gatekeeper"], "project_strategist");
}

#[tokio::test]
async fn test_register_is_idempotent_per_dedup_key() {
    let app = app();
    let (status, first) = call(&app, "POST", "/agents/register", Some(registration("qa-1", "qa_engineer"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);

    let (status, second) = call(&app, "POST", "/agents/register", Some(registration("qa-1", "qa_engineer"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created"], false);
    assert_eq!(first["id"], second["id"]);

    let (_, agents) = call(&app, "GET", "/agents", None).await;
    assert_eq!(agents.as_array().unwrap().len(), 1);

    let id = first["id"].as_str().unwrap();
    let (status, agent) = call(&app, "GET", &format!("/agents/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent["status"], "active");
}

#[tokio::test]
async fn test_invalid_registration_names_the_field() {
    let app = app();
    let mut body = registration("qa-1", "qa_engineer");
    body["version"] = json!("v1");
    let (status, error) = call(&app, "POST", "/agents/register", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "validation_error");
    assert_eq!(error["field"], "version");
}

#[tokio::test]
async fn test_heartbeat_for_unknown_agent_is_not_found() {
    let app = app();
    let (status, _) = call(
        &app,
        "POST",
        "/agents/heartbeat",
        Some(json!({"agent_id": "5f0c8a4e-8f7e-4c1e-9d59-2f4a4b0e1c11"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/agents/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_gate_leaves_phase_unchanged() {
    let app = app();
    let (status, _) = call(
        &app,
        "POST",
        "/project/facts",
        Some(json!({"key": "feasibility_score", "value": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/phase/architecture", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Quality Gate Failed");
    assert_eq!(body["validation"]["overall_status"], "failed");

    let (_, crew) = call(&app, "GET", "/crew", None).await;
    assert_eq!(crew["phase"], "planning");

    let (status, change) = call(&app, "POST", "/phase/architecture?force=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(change["forced"], true);
    assert_eq!(change["gatekeeper"], "system_architect");
}

#[tokio::test]
async fn test_validate_transition_is_a_dry_run() {
    let app = app();
    let (status, report) = call(&app, "GET", "/validate-transition?target_phase=architecture", None).await;
    assert_eq!(status, StatusCode::OK);
    // Nothing reported yet: every check warns.
    assert_eq!(report["overall_status"], "warning");
    assert_eq!(report["checks"].as_array().unwrap().len(), 2);

    let (_, crew) = call(&app, "GET", "/crew", None).await;
    assert_eq!(crew["phase"], "planning");

    let (status, _) = call(&app, "GET", "/validate-transition?target_phase=retirement", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_handoff_outcomes_follow_the_active_crew() {
    let app = app();
    let handoff = |target: &str| {
        json!({
            "source_agent": "broski_orchestrator",
            "target_agent": target,
            "task_id": "task-42",
            "context": {"note": "scope agreed"},
        })
    };

    let (status, accepted) = call(&app, "POST", "/handoff", Some(handoff("project_strategist"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (_, queued) = call(&app, "POST", "/handoff", Some(handoff("qa_engineer"))).await;
    assert_eq!(queued["status"], "queued");

    let (_, rejected) = call(&app, "POST", "/handoff", Some(handoff("ghost"))).await;
    assert_eq!(rejected["status"], "rejected");

    let (_, history) = call(&app, "GET", "/task/task-42/handoffs", None).await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["target"], "project_strategist");

    let (_, parked) = call(&app, "GET", "/handoffs/queued", None).await;
    assert_eq!(parked.as_array().unwrap().len(), 1);
    assert_eq!(parked[0]["request"]["target_agent"], "qa_engineer");
}

#[tokio::test]
async fn test_duplicate_event_is_dropped_and_paused_publisher_is_throttled() {
    let app = app();
    let event = json!({
        "id": "evt-1",
        "topic": "agent.events",
        "type": "status",
        "payload": {"ok": true},
        "publisher": "backend_specialist",
    });

    let (status, first) = call(&app, "POST", "/events", Some(event.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["delivered"], true);
    let (_, second) = call(&app, "POST", "/events", Some(event.clone())).await;
    assert_eq!(second["delivered"], false);

    for _ in 0..3 {
        call(
            &app,
            "POST",
            "/events/publishers/backend_specialist/health",
            Some(json!({"success": false})),
        )
        .await;
    }
    let mut next = event.clone();
    next["id"] = json!("evt-2");
    let (status, body) = call(&app, "POST", "/events", Some(next)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["consecutive_failures"], 3);
}

#[tokio::test]
async fn test_plan_creates_a_task() {
    let app = app();
    let (status, _) = call(&app, "POST", "/plan", Some(json!({"task": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, receipt) = call(
        &app,
        "POST",
        "/plan",
        Some(json!({"task": "Harden the auth flow", "context": {"repo": "shop"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["recommended_agent"], "security_engineer");
    assert_eq!(receipt["assigned_agents"][0], "project_strategist");

    let task_id = receipt["task_id"].as_str().unwrap();
    let (status, task) = call(&app, "GET", &format!("/task/{}", task_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["description"], "Harden the auth flow");

    let (status, _) = call(&app, "GET", "/task/task-missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_agents_report_offline() {
    let app = app_with(StubAgents {
        down: vec!["qa_engineer".to_string()],
        ..StubAgents::default()
    });
    let (status, statuses) = call(&app, "GET", "/agents/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(statuses["qa_engineer"]["status"], "offline");
    assert_eq!(statuses["backend_specialist"]["status"], "online");

    let (status, body) = call(&app, "POST", "/agent/qa_engineer/execute", Some(json!({"task": "x"}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["agent"], "qa_engineer");

    let (status, body) = call(&app, "POST", "/agent/backend_specialist/execute", Some(json!({"task": "x"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["echo"]["task"], "x");
}

#[tokio::test]
async fn test_starting_a_workflow_records_its_sequence() {
    let app = app();
    let (status, receipt) = call(
        &app,
        "POST",
        "/workflow/feature",
        Some(json!({"description": "Saved carts for guests"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["type"], "feature");
    assert_eq!(receipt["status"], "initiated");
    assert_eq!(receipt["agents"].as_array().unwrap().len(), 7);
    assert_eq!(receipt["agents"][6], "devops_engineer");

    let workflow_id = receipt["workflow_id"].as_str().unwrap();
    assert!(workflow_id.starts_with("workflow_feature_"));
    let (status, record) = call(&app, "GET", &format!("/workflows/{}", workflow_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["description"], "Saved carts for guests");

    let (status, body) = call(&app, "POST", "/workflow/migration", Some(json!({"description": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["field"], "workflow_type");

    let (status, _) = call(&app, "GET", "/workflows/workflow_missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

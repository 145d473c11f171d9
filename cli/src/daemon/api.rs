// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Control Plane HTTP API
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /`, `GET /health` | banner, health report |
//! | `POST /agents/register`, `POST /agents/heartbeat` | registry writes |
//! | `GET /agents`, `GET /agents/{id}`, `GET /agents/status`, `GET /agents/watch` | registry reads |
//! | `POST /phase/{name}`, `GET /validate-transition`, `GET /crew` | phase state machine |
//! | `GET`/`POST /project/facts` | quality gate inputs |
//! | `POST /plan`, `GET /task/{id}`, `POST /task/{id}/result`, `GET /task/{id}/handoffs` | tasks |
//! | `POST /workflow/{workflow_type}`, `GET /workflows/{id}` | predefined workflows |
//! | `POST /agent/{name}/execute` | execute proxy |
//! | `POST /handoff`, `GET /handoffs/queued` | handoffs |
//! | `POST /events`, `GET /events/{topic}`, `POST /events/publishers/{publisher}/health` | event bus |
//!
//! Streams are server-sent events; neither replays anything published
//! before the client connected.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crewplane_core::domain::agent::{
    AgentDescriptor, AgentId, Heartbeat, HeartbeatAck, RegistrationReceipt, RegistrationRequest,
};
use crewplane_core::domain::error::ControlPlaneError;
use crewplane_core::domain::events::{PublishReceipt, PublishRequest, PublisherHealth};
use crewplane_core::domain::handoff::{HandoffLogEntry, HandoffOutcome, HandoffRequest, QueuedHandoff};
use crewplane_core::domain::phase::ProjectPhase;
use crewplane_core::domain::task::TaskRecord;
use crewplane_core::domain::validation::{ProjectState, ValidationReport};
use crewplane_core::domain::workflow::{WorkflowReceipt, WorkflowRecord, WorkflowRequest};
use crewplane_swarm::application::{PlanReceipt, PlanRequest, TaskResultReport};
use crewplane_swarm::{CrewSnapshot, PhaseChange};

use super::error::ApiResult;
use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/agents", get(list_agents))
        .route("/agents/register", post(register_agent))
        .route("/agents/heartbeat", post(heartbeat))
        .route("/agents/status", get(poll_agent_status))
        .route("/agents/watch", get(watch_agents))
        .route("/agents/{id}", get(get_agent))
        .route("/phase/{name}", post(set_phase))
        .route("/validate-transition", get(validate_transition))
        .route("/crew", get(crew))
        .route("/project/facts", get(get_facts).post(record_fact))
        .route("/plan", post(plan_task))
        .route("/task/{id}", get(get_task))
        .route("/task/{id}/result", post(task_result))
        .route("/task/{id}/handoffs", get(task_handoffs))
        .route("/workflow/{workflow_type}", post(start_workflow))
        .route("/workflows/{id}", get(get_workflow))
        .route("/agent/{name}/execute", post(execute_agent))
        .route("/handoff", post(handoff))
        .route("/handoffs/queued", get(queued_handoffs))
        .route("/events", post(publish_event))
        .route("/events/{topic}", get(subscribe_topic))
        .route("/events/publishers/{publisher}/health", post(report_publisher_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn banner(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let agents: Vec<String> = state
        .directory
        .known_agents()
        .await?
        .into_iter()
        .map(|a| a.name)
        .collect();
    Ok(Json(json!({
        "service": "crewplane",
        "version": env!("CARGO_PKG_VERSION"),
        "agents": agents,
        "status": "running",
    })))
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    /// `ok`, or the probe error. Advisory: never fails the report.
    pub store: String,
    pub storage_backend: String,
    pub phase: ProjectPhase,
    pub active_crew: CrewSnapshot,
    pub uptime_seconds: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let store = match state.task_store.ping().await {
        Ok(()) => "ok".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let active_crew = state.swarm.crew_snapshot();
    Json(HealthReport {
        status: "healthy".to_string(),
        store,
        storage_backend: state.storage_backend.to_string(),
        phase: active_crew.phase,
        active_crew,
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

// Registry

async fn register_agent(
    State(state): State<AppState>,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationReceipt>)> {
    let receipt = state.registry.register(request).await?;
    let status = if receipt.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(receipt)))
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(heartbeat): Json<Heartbeat>,
) -> ApiResult<Json<HeartbeatAck>> {
    Ok(Json(state.registry.heartbeat(heartbeat).await?))
}

async fn list_agents(State(state): State<AppState>) -> ApiResult<Json<Vec<AgentDescriptor>>> {
    Ok(Json(state.registry.list().await?))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentDescriptor>> {
    let agent_id =
        AgentId::from_string(&id).map_err(|_| ControlPlaneError::not_found("agent", id.clone()))?;
    Ok(Json(state.registry.get(agent_id).await?))
}

/// Poll every known agent's `/status`. Unreachable agents are reported as
/// offline inside a 200.
async fn poll_agent_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let agents = state.directory.known_agents().await?;
    let polls = agents.into_iter().map(|agent| {
        let client = state.agent_client.clone();
        async move {
            let report = match client.status(&agent.name, &agent.base_url).await {
                Ok(details) => json!({"status": "online", "url": agent.base_url, "details": details}),
                Err(e) => {
                    debug!(agent = %agent.name, error = %e, "Agent status poll failed");
                    json!({"status": "offline", "url": agent.base_url, "error": e.to_string()})
                }
            };
            (agent.name, report)
        }
    });
    let statuses: serde_json::Map<String, Value> =
        futures::future::join_all(polls).await.into_iter().collect();
    Ok(Json(Value::Object(statuses)))
}

async fn watch_agents(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state
        .registry
        .watch()
        .map(|event| Ok(json_event("registry", &event)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// Phases and crews

#[derive(Debug, Default, Deserialize)]
struct PhaseQuery {
    #[serde(default)]
    force: bool,
}

async fn set_phase(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<PhaseQuery>,
) -> ApiResult<Json<PhaseChange>> {
    let target: ProjectPhase = name.parse()?;
    Ok(Json(state.swarm.transition(target, query.force)?))
}

#[derive(Debug, Deserialize)]
struct TransitionQuery {
    target_phase: String,
}

async fn validate_transition(
    State(state): State<AppState>,
    Query(query): Query<TransitionQuery>,
) -> ApiResult<Json<ValidationReport>> {
    let target: ProjectPhase = query.target_phase.parse()?;
    Ok(Json(state.swarm.validate_transition(target)))
}

async fn crew(State(state): State<AppState>) -> Json<CrewSnapshot> {
    Json(state.swarm.crew_snapshot())
}

#[derive(Debug, Deserialize)]
struct FactRequest {
    key: String,
    value: Value,
}

async fn get_facts(State(state): State<AppState>) -> Json<ProjectState> {
    Json(state.gates.facts())
}

async fn record_fact(
    State(state): State<AppState>,
    Json(fact): Json<FactRequest>,
) -> ApiResult<Json<ProjectState>> {
    state.gates.record_fact(&fact.key, fact.value)?;
    Ok(Json(state.gates.facts()))
}

// Tasks

async fn plan_task(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> ApiResult<Json<PlanReceipt>> {
    Ok(Json(state.tasks.plan(request).await?))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskRecord>> {
    Ok(Json(state.tasks.get(&id).await?))
}

async fn start_workflow(
    State(state): State<AppState>,
    Path(workflow_type): Path<String>,
    Json(request): Json<WorkflowRequest>,
) -> ApiResult<Json<WorkflowReceipt>> {
    Ok(Json(state.workflows.start(&workflow_type, request).await?))
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkflowRecord>> {
    Ok(Json(state.workflows.get(&id).await?))
}

async fn task_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(report): Json<TaskResultReport>,
) -> ApiResult<Json<TaskRecord>> {
    Ok(Json(state.tasks.record_result(&id, report).await?))
}

async fn task_handoffs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<HandoffLogEntry>>> {
    Ok(Json(state.handoffs.history(&id).await?))
}

async fn execute_agent(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<Value>> {
    let target = state.directory.resolve(&name).await?;
    let response = state
        .agent_client
        .execute(&target.name, &target.base_url, &payload)
        .await?;
    Ok(Json(response))
}

// Handoffs

async fn handoff(
    State(state): State<AppState>,
    Json(request): Json<HandoffRequest>,
) -> ApiResult<Json<HandoffOutcome>> {
    Ok(Json(state.handoffs.handoff(request).await?))
}

async fn queued_handoffs(State(state): State<AppState>) -> Json<Vec<QueuedHandoff>> {
    Json(state.handoffs.queued_handoffs())
}

// Event bus

async fn publish_event(
    State(state): State<AppState>,
    Json(request): Json<PublishRequest>,
) -> ApiResult<Json<PublishReceipt>> {
    Ok(Json(state.events.publish(request).await?))
}

async fn subscribe_topic(
    State(state): State<AppState>,
    Path(topic): Path<String>,
) -> impl IntoResponse {
    let stream = state
        .events
        .subscribe(&topic)
        .map(|envelope| Ok::<_, Infallible>(json_event("envelope", &envelope)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct HealthReportRequest {
    success: bool,
}

async fn report_publisher_health(
    State(state): State<AppState>,
    Path(publisher): Path<String>,
    Json(report): Json<HealthReportRequest>,
) -> ApiResult<Json<PublisherHealth>> {
    Ok(Json(state.events.report_health(&publisher, report.success).await?))
}

fn json_event<T: Serialize>(name: &'static str, value: &T) -> Event {
    Event::default()
        .event(name)
        .json_data(value)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

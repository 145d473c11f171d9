// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Agent Registry Domain
//!
//! Types describing a worker agent as the control plane sees it: identity,
//! declared capabilities, and heartbeat-driven liveness.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AgentId`] | Stable identifier handed out on first registration |
//! | [`AgentDescriptor`] | Registry record, keyed by `dedup_key` |
//! | [`AgentStatus`] | `active → stale → offline` liveness ladder |
//! | [`RegistrationRequest`] | Validated payload of `POST /agents/register` |
//! | [`LivenessThresholds`] | Elapsed-time cut-offs used by the stale sweep |

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::domain::error::ControlPlaneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Liveness of a registered agent as derived from its heartbeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Active,
    Stale,
    Offline,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Stale => "stale",
            AgentStatus::Offline => "offline",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AgentStatus::Active),
            "stale" => Some(AgentStatus::Stale),
            "offline" => Some(AgentStatus::Offline),
            _ => None,
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut-offs measured from `last_heartbeat_at`.
///
/// An agent silent for at least `stale_after` is stale; silent for at least
/// `offline_after` it is offline. `stale_after < offline_after` is enforced by
/// config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessThresholds {
    pub stale_after: Duration,
    pub offline_after: Duration,
}

impl LivenessThresholds {
    pub fn status_for(&self, elapsed: Duration) -> AgentStatus {
        if elapsed >= self.offline_after {
            AgentStatus::Offline
        } else if elapsed >= self.stale_after {
            AgentStatus::Stale
        } else {
            AgentStatus::Active
        }
    }
}

impl Default for LivenessThresholds {
    fn default() -> Self {
        Self {
            stale_after: Duration::seconds(30),
            offline_after: Duration::seconds(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub name: String,
    pub role: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub health_url: String,
    pub dedup_key: String,
    pub status: AgentStatus,
    /// Last self-reported load (0.0 = idle).
    #[serde(default)]
    pub load: f64,
    /// Free-form status string from the last heartbeat ("active", "busy", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_status: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl AgentDescriptor {
    pub fn from_registration(request: RegistrationRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: AgentId::new(),
            name: request.name,
            role: request.role,
            version: request.version,
            capabilities: request.capabilities,
            topics: request.topics,
            health_url: request.health_url,
            dedup_key: request.dedup_key,
            status: AgentStatus::Active,
            load: 0.0,
            reported_status: None,
            registered_at: now,
            last_heartbeat_at: now,
        }
    }

    /// Last-write-wins refresh from a repeated registration. The id and the
    /// original registration time are kept.
    pub fn apply_registration(&mut self, request: RegistrationRequest, now: DateTime<Utc>) {
        self.name = request.name;
        self.role = request.role;
        self.version = request.version;
        self.capabilities = request.capabilities;
        self.topics = request.topics;
        self.health_url = request.health_url;
        self.status = AgentStatus::Active;
        self.last_heartbeat_at = now;
    }

    pub fn record_heartbeat(&mut self, heartbeat: &Heartbeat, now: DateTime<Utc>) -> AgentStatus {
        let previous = self.status;
        self.status = AgentStatus::Active;
        self.load = heartbeat.load;
        self.reported_status = Some(heartbeat.status.clone());
        self.last_heartbeat_at = now;
        previous
    }

    pub fn silence(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_heartbeat_at)
    }

    /// Base URL of the agent's own HTTP service, derived from its health URL.
    pub fn base_url(&self) -> String {
        self.health_url
            .trim_end_matches('/')
            .trim_end_matches("/health")
            .to_string()
    }
}

/// Body of `POST /agents/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub role: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub health_url: String,
    pub dedup_key: String,
}

fn semver_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?(?:\+[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*)?$",
        )
        .expect("semver pattern is a valid regex")
    })
}

impl RegistrationRequest {
    pub fn validate(&self) -> Result<(), ControlPlaneError> {
        if self.dedup_key.trim().is_empty() {
            return Err(ControlPlaneError::validation("dedup_key", "must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(ControlPlaneError::validation("name", "must not be empty"));
        }
        if self.role.trim().is_empty() {
            return Err(ControlPlaneError::validation("role", "must not be empty"));
        }
        if !semver_pattern().is_match(&self.version) {
            return Err(ControlPlaneError::validation(
                "version",
                format!("'{}' is not a semantic version (MAJOR.MINOR.PATCH)", self.version),
            ));
        }
        match url::Url::parse(&self.health_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => {
                return Err(ControlPlaneError::validation(
                    "health_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ))
            }
            Err(e) => {
                return Err(ControlPlaneError::validation(
                    "health_url",
                    format!("'{}' is not a valid URL: {}", self.health_url, e),
                ))
            }
        }
        Ok(())
    }
}

/// Body of `POST /agents/heartbeat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub agent_id: String,
    #[serde(default = "default_reported_status")]
    pub status: String,
    #[serde(default)]
    pub load: f64,
}

fn default_reported_status() -> String {
    "active".to_string()
}

impl Heartbeat {
    pub fn validate(&self) -> Result<(), ControlPlaneError> {
        if !self.load.is_finite() || self.load < 0.0 {
            return Err(ControlPlaneError::validation(
                "load",
                format!("must be a finite non-negative number, got {}", self.load),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationReceipt {
    pub id: AgentId,
    /// `false` when an existing registration with the same dedup key was refreshed.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatAck {
    pub agent_id: AgentId,
    pub status: AgentStatus,
    pub acknowledged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RegistrationRequest {
        RegistrationRequest {
            name: "qa-engineer".to_string(),
            role: "qa_engineer".to_string(),
            version: "1.0.0".to_string(),
            capabilities: vec!["pytest".to_string()],
            topics: vec!["agent.events".to_string()],
            health_url: "http://qa-engineer:8005/health".to_string(),
            dedup_key: "qa-engineer".to_string(),
        }
    }

    #[test]
    fn test_valid_registration_passes() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_prerelease_versions_are_accepted() {
        let mut req = request();
        req.version = "2.1.0-rc.1+build.7".to_string();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_malformed_version_is_rejected_with_field() {
        let mut req = request();
        req.version = "1.0".to_string();
        match req.validate() {
            Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "version"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_dedup_key_is_rejected() {
        let mut req = request();
        req.dedup_key = "   ".to_string();
        match req.validate() {
            Err(ControlPlaneError::Validation { field, .. }) => assert_eq!(field, "dedup_key"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_http_health_url_is_rejected() {
        let mut req = request();
        req.health_url = "ftp://qa/health".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_liveness_ladder() {
        let thresholds = LivenessThresholds::default();
        assert_eq!(thresholds.status_for(Duration::seconds(5)), AgentStatus::Active);
        assert_eq!(thresholds.status_for(Duration::seconds(30)), AgentStatus::Stale);
        assert_eq!(thresholds.status_for(Duration::seconds(119)), AgentStatus::Stale);
        assert_eq!(thresholds.status_for(Duration::seconds(120)), AgentStatus::Offline);
    }

    #[test]
    fn test_reregistration_keeps_id_and_registration_time() {
        let t0 = Utc::now();
        let mut descriptor = AgentDescriptor::from_registration(request(), t0);
        let id = descriptor.id;

        let mut refreshed = request();
        refreshed.capabilities = vec!["playwright".to_string()];
        descriptor.apply_registration(refreshed, t0 + Duration::seconds(10));

        assert_eq!(descriptor.id, id);
        assert_eq!(descriptor.registered_at, t0);
        assert_eq!(descriptor.capabilities, vec!["playwright".to_string()]);
    }

    #[test]
    fn test_base_url_strips_health_suffix() {
        let descriptor = AgentDescriptor::from_registration(request(), Utc::now());
        assert_eq!(descriptor.base_url(), "http://qa-engineer:8005");
    }

    #[test]
    fn test_negative_load_is_rejected() {
        let hb = Heartbeat {
            agent_id: AgentId::new().to_string(),
            status: "active".to_string(),
            load: -1.0,
        };
        assert!(hb.validate().is_err());
    }
}

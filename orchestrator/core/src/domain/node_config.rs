// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Control Plane Configuration
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing one
// crewplane daemon:
// - network bind address and port
// - storage backend (in-memory or PostgreSQL)
// - heartbeat liveness thresholds
// - event bus dedup window, circuit breaker and topic ACLs
// - outbound dispatch timeouts
// - static agent endpoints and optional crew overrides
// - logging and metrics

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::agent::LivenessThresholds;
use crate::domain::crew::{AgentRole, CrewCatalog, CrewConfig};
use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "crewplane.dev/v1";
pub const KIND: &str = "ControlPlaneConfig";

/// Top-level control plane configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfigManifest {
    /// API version (must be "crewplane.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "ControlPlaneConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: ControlPlaneSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneSpec {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub liveness: LivenessConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Static agent endpoints. Roles missing here are resolved through the
    /// registry (health URL of a registered agent with that role).
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentEndpoint>,

    /// Replaces the built-in crew for each listed phase.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crews: Vec<CrewConfig>,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for ControlPlaneSpec {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            storage: StorageConfig::default(),
            liveness: LivenessConfig::default(),
            event_bus: EventBusConfig::default(),
            dispatch: DispatchConfig::default(),
            agents: default_agents(),
            crews: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackendKind {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackendKind,

    /// PostgreSQL URL; required when `backend: postgres`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,
}

impl StorageConfig {
    pub fn to_backend(&self) -> anyhow::Result<StorageBackend> {
        match self.backend {
            StorageBackendKind::InMemory => Ok(StorageBackend::InMemory),
            StorageBackendKind::Postgres => {
                let connection_string = self.connection_string.clone().ok_or_else(|| {
                    anyhow::anyhow!("spec.storage.connection_string is required for the postgres backend")
                })?;
                Ok(StorageBackend::PostgreSQL(PostgresConfig { connection_string }))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    #[serde(default = "default_stale_after", with = "humantime_serde")]
    pub stale_after: Duration,

    #[serde(default = "default_offline_after", with = "humantime_serde")]
    pub offline_after: Duration,

    /// How often the registry sweep runs.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl LivenessConfig {
    pub fn thresholds(&self) -> LivenessThresholds {
        LivenessThresholds {
            stale_after: to_chrono(self.stale_after),
            offline_after: to_chrono(self.offline_after),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            stale_after: default_stale_after(),
            offline_after: default_offline_after(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Window in which a repeated event id is suppressed.
    #[serde(default = "default_dedup_ttl", with = "humantime_serde")]
    pub dedup_ttl: Duration,

    /// How often expired dedup claims and idle topic channels are dropped.
    #[serde(default = "default_purge_interval", with = "humantime_serde")]
    pub purge_interval: Duration,

    /// Consecutive failed health reports that open a publisher's circuit.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Buffered events per broadcast channel before slow receivers lag.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default)]
    pub acl: TopicAcl,
}

impl EventBusConfig {
    pub fn dedup_window(&self) -> chrono::Duration {
        to_chrono(self.dedup_ttl)
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            dedup_ttl: default_dedup_ttl(),
            purge_interval: default_purge_interval(),
            failure_threshold: default_failure_threshold(),
            channel_capacity: default_channel_capacity(),
            acl: TopicAcl::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AclPolicy {
    #[default]
    Allow,
    Deny,
}

/// Topic pattern → publisher patterns allowed to publish on matching topics.
///
/// Patterns are exact names, `*`, or a prefix ending in `*` (`agent.*`).
/// A topic matched by at least one entry is restricted to the publishers
/// listed across all matching entries; an unmatched topic falls back to
/// `default_policy`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicAcl {
    #[serde(default)]
    pub default_policy: AclPolicy,

    #[serde(default)]
    pub topics: BTreeMap<String, Vec<String>>,
}

impl TopicAcl {
    pub fn permits(&self, publisher: &str, topic: &str) -> bool {
        let mut restricted = false;
        for (topic_pattern, publishers) in &self.topics {
            if !pattern_matches(topic_pattern, topic) {
                continue;
            }
            restricted = true;
            if publishers.iter().any(|p| pattern_matches(p, publisher)) {
                return true;
            }
        }
        !restricted && self.default_policy == AclPolicy::Allow
    }
}

fn pattern_matches(pattern: &str, value: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => value.starts_with(prefix),
        None => pattern == value,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Timeout for handoff dispatch, health and status polls.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Timeout for the synchronous execute proxy and strategist delegation.
    #[serde(default = "default_execute_timeout", with = "humantime_serde")]
    pub execute_timeout: Duration,

    /// Queued handoffs kept for inspection; the oldest is evicted beyond this.
    #[serde(default = "default_max_queued_handoffs")]
    pub max_queued_handoffs: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            execute_timeout: default_execute_timeout(),
            max_queued_handoffs: default_max_queued_handoffs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    pub role: AgentRole,
    /// Base URL of the agent service, e.g. `http://qa-engineer:8005`.
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_stale_after() -> Duration {
    Duration::from_secs(30)
}

fn default_offline_after() -> Duration {
    Duration::from_secs(120)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_dedup_ttl() -> Duration {
    Duration::from_secs(600)
}

fn default_purge_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_channel_capacity() -> usize {
    1000
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_execute_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_max_queued_handoffs() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

/// The core specialists, each reachable at `http://<role-with-dashes>:<port>`.
fn default_agents() -> Vec<AgentEndpoint> {
    [
        (AgentRole::ProjectStrategist, 8001),
        (AgentRole::FrontendSpecialist, 8002),
        (AgentRole::BackendSpecialist, 8003),
        (AgentRole::DatabaseArchitect, 8004),
        (AgentRole::QaEngineer, 8005),
        (AgentRole::DevopsEngineer, 8006),
        (AgentRole::SecurityEngineer, 8007),
        (AgentRole::SystemArchitect, 8008),
    ]
    .into_iter()
    .map(|(role, port)| AgentEndpoint {
        role,
        url: format!("http://{}:{}", role.as_str().replace('_', "-"), port),
    })
    .collect()
}

impl Default for ControlPlaneConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "crewplane".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: ControlPlaneSpec::default(),
        }
    }
}

impl ControlPlaneConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CREWPLANE_CONFIG_PATH environment variable
    /// 2. ./crewplane-config.yaml (working directory)
    /// 3. ~/.crewplane/config.yaml (user home)
    /// 4. /etc/crewplane/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CREWPLANE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./crewplane-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".crewplane").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/crewplane/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path (fail if missing/invalid)
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CREWPLANE_PORT") {
            match val.parse::<u16>() {
                Ok(port) => {
                    tracing::info!("Environment override: CREWPLANE_PORT={}", port);
                    self.spec.network.port = port;
                }
                Err(_) => tracing::warn!("Invalid value for CREWPLANE_PORT: '{}'. Ignoring.", val),
            }
        }

        if let Ok(url) = std::env::var("CREWPLANE_DATABASE_URL") {
            tracing::info!("Environment override: CREWPLANE_DATABASE_URL set, using postgres storage");
            self.spec.storage.backend = StorageBackendKind::Postgres;
            self.spec.storage.connection_string = Some(url);
        }

        if let Ok(val) = std::env::var("CREWPLANE_LOG_FORMAT") {
            match val.to_lowercase().as_str() {
                "json" => self.spec.observability.logging.format = LogFormat::Json,
                "compact" | "text" => self.spec.observability.logging.format = LogFormat::Compact,
                _ => tracing::warn!(
                    "Invalid value for CREWPLANE_LOG_FORMAT: '{}'. Expected json/compact. Ignoring.",
                    val
                ),
            }
        }
    }

    /// Built-in crews with `spec.crews` overrides applied.
    pub fn crew_catalog(&self) -> CrewCatalog {
        CrewCatalog::default().with_overrides(self.spec.crews.iter().cloned())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let liveness = &self.spec.liveness;
        if liveness.stale_after >= liveness.offline_after {
            anyhow::bail!(
                "spec.liveness.stale_after ({:?}) must be shorter than offline_after ({:?})",
                liveness.stale_after,
                liveness.offline_after
            );
        }
        if liveness.sweep_interval.is_zero() {
            anyhow::bail!("spec.liveness.sweep_interval must be greater than zero");
        }

        let bus = &self.spec.event_bus;
        if bus.failure_threshold == 0 {
            anyhow::bail!("spec.event_bus.failure_threshold must be at least 1");
        }
        if bus.channel_capacity == 0 {
            anyhow::bail!("spec.event_bus.channel_capacity must be at least 1");
        }
        if bus.dedup_ttl.is_zero() {
            anyhow::bail!("spec.event_bus.dedup_ttl must be greater than zero");
        }
        if bus.purge_interval.is_zero() {
            anyhow::bail!("spec.event_bus.purge_interval must be greater than zero");
        }

        if self.spec.dispatch.request_timeout.is_zero() || self.spec.dispatch.execute_timeout.is_zero() {
            anyhow::bail!("spec.dispatch timeouts must be greater than zero");
        }
        if self.spec.dispatch.max_queued_handoffs == 0 {
            anyhow::bail!("spec.dispatch.max_queued_handoffs must be at least 1");
        }

        if self.spec.storage.backend == StorageBackendKind::Postgres
            && self.spec.storage.connection_string.is_none()
        {
            anyhow::bail!("spec.storage.connection_string is required for the postgres backend");
        }

        for agent in &self.spec.agents {
            let parsed = url::Url::parse(&agent.url)
                .map_err(|e| anyhow::anyhow!("Invalid URL '{}' for agent {}: {}", agent.url, agent.role, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("Agent {} URL must be http(s), got '{}'", agent.role, agent.url);
            }
        }

        let mut seen = HashSet::new();
        for crew in &self.spec.crews {
            if !seen.insert(crew.phase) {
                anyhow::bail!("spec.crews lists phase '{}' more than once", crew.phase);
            }
            if crew.primary_agents.is_empty() {
                anyhow::bail!("Crew for phase '{}' has no primary agents", crew.phase);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::phase::ProjectPhase;
    use std::io::Write;

    #[test]
    fn test_default_manifest() {
        let manifest = ControlPlaneConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert!(!manifest.metadata.name.is_empty());
        assert_eq!(manifest.spec.agents.len(), 8);
        assert_eq!(manifest.spec.liveness.stale_after, Duration::from_secs(30));
        assert_eq!(manifest.spec.event_bus.failure_threshold, 3);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_default_agent_urls() {
        let manifest = ControlPlaneConfigManifest::default();
        let qa = manifest
            .spec
            .agents
            .iter()
            .find(|a| a.role == AgentRole::QaEngineer)
            .unwrap();
        assert_eq!(qa.url, "http://qa-engineer:8005");
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: crewplane.dev/v1
kind: ControlPlaneConfig
metadata:
  name: dev
spec:
  liveness:
    stale_after: 15s
    offline_after: 1m
  event_bus:
    dedup_ttl: 5m
    acl:
      default_policy: deny
      topics:
        "phase.*": ["broski_orchestrator"]
"#;
        let manifest = ControlPlaneConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.liveness.stale_after, Duration::from_secs(15));
        assert_eq!(manifest.spec.liveness.offline_after, Duration::from_secs(60));
        assert_eq!(manifest.spec.event_bus.dedup_ttl, Duration::from_secs(300));
        assert_eq!(manifest.spec.network.port, 8000);
        assert_eq!(manifest.spec.event_bus.acl.default_policy, AclPolicy::Deny);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let manifest = ControlPlaneConfigManifest::default();
        write!(file, "{}", serde_yaml::to_string(&manifest).unwrap()).unwrap();

        let loaded = ControlPlaneConfigManifest::from_yaml_file(file.path()).unwrap();
        assert_eq!(loaded.metadata.name, manifest.metadata.name);
        assert_eq!(loaded.spec.agents, manifest.spec.agents);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let result = ControlPlaneConfigManifest::load_or_default(Some(PathBuf::from(
            "/nonexistent/crewplane-config.yaml",
        )));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut manifest = ControlPlaneConfigManifest::default();

        manifest.api_version = "wrong/v1".to_string();
        assert!(manifest.validate().is_err());
        manifest.api_version = API_VERSION.to_string();

        manifest.spec.liveness.stale_after = Duration::from_secs(120);
        assert!(manifest.validate().is_err());
        manifest.spec.liveness.stale_after = Duration::from_secs(30);

        manifest.spec.event_bus.failure_threshold = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.event_bus.failure_threshold = 3;

        manifest.spec.agents.push(AgentEndpoint {
            role: AgentRole::DocSyncer,
            url: "not a url".to_string(),
        });
        assert!(manifest.validate().is_err());
        manifest.spec.agents.pop();

        let crew = CrewConfig {
            phase: ProjectPhase::Testing,
            primary_agents: vec![AgentRole::QaEngineer],
            support_agents: vec![],
            gatekeeper: AgentRole::QaEngineer,
        };
        manifest.spec.crews = vec![crew.clone(), crew];
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_acl_patterns() {
        let acl = TopicAcl {
            default_policy: AclPolicy::Allow,
            topics: BTreeMap::from([
                ("phase.*".to_string(), vec!["broski_orchestrator".to_string()]),
                ("deploy.events".to_string(), vec!["devops-*".to_string()]),
            ]),
        };
        assert!(acl.permits("broski_orchestrator", "phase.changes"));
        assert!(!acl.permits("frontend-specialist", "phase.changes"));
        assert!(acl.permits("devops-engineer", "deploy.events"));
        assert!(!acl.permits("qa-engineer", "deploy.events"));
        assert!(acl.permits("anyone", "agent.events"));

        let closed = TopicAcl {
            default_policy: AclPolicy::Deny,
            topics: BTreeMap::new(),
        };
        assert!(!closed.permits("anyone", "agent.events"));
    }

    #[test]
    fn test_crew_override_applies() {
        let mut manifest = ControlPlaneConfigManifest::default();
        manifest.spec.crews = vec![CrewConfig {
            phase: ProjectPhase::Maintenance,
            primary_agents: vec![AgentRole::DevopsEngineer],
            support_agents: vec![],
            gatekeeper: AgentRole::SecurityEngineer,
        }];
        let catalog = manifest.crew_catalog();
        assert_eq!(
            catalog.get(ProjectPhase::Maintenance).unwrap().gatekeeper,
            AgentRole::SecurityEngineer
        );
    }
}

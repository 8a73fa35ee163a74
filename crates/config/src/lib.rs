//! Configuration loading, validation, and management for Boardroom.
//!
//! Loads configuration from `~/.boardroom/config.toml` with environment
//! variable overrides. Validates all settings at startup.

pub mod roster;

use boardroom_core::AgentProfile;
use boardroom_core::store::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.boardroom/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used when a profile does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// HTTP timeout for one completion call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Tenant that memory, artifacts and tasks are scoped to
    #[serde(default = "default_principal")]
    pub principal_id: String,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Agent roster
    #[serde(default = "roster::default_agents")]
    pub agents: Vec<AgentProfile>,

    /// Artifact-gated workflows
    #[serde(default = "roster::default_workflows")]
    pub workflows: Vec<WorkflowConfig>,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> u64 {
    120
}
fn default_principal() -> String {
    "local".into()
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("principal_id", &self.principal_id)
            .field("orchestrator", &self.orchestrator)
            .field("heartbeat", &self.heartbeat)
            .field("storage", &self.storage)
            .field("tools", &self.tools)
            .field("agents", &self.agents.len())
            .field("workflows", &self.workflows.len())
            .finish()
    }
}

/// What the chairman's TERMINATE means in an autonomous session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// TERMINATE always ends the session
    Terminate,
    /// Autonomous sessions hand over to the review agent instead of stopping
    #[default]
    StrategicReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Iterations before the loop suspends and asks to continue
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default)]
    pub completion_policy: CompletionPolicy,

    /// Agent selected instead of TERMINATE under `strategic_review`
    #[serde(default = "default_review_agent")]
    pub review_agent: String,

    /// Agent id whose runtime makes heuristic decisions
    #[serde(default = "default_chairman_agent")]
    pub chairman_agent: String,

    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: u32,

    /// Consecutive transport failures before the loop gives up
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Messages of shared history shown to the chairman
    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_max_turns() -> u32 {
    10
}
fn default_review_agent() -> String {
    "vision-founder-agent".into()
}
fn default_chairman_agent() -> String {
    "board-chairman".into()
}
fn default_max_delegation_depth() -> u32 {
    1
}
fn default_max_consecutive_failures() -> u32 {
    2
}
fn default_history_window() -> usize {
    15
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            completion_policy: CompletionPolicy::default(),
            review_agent: default_review_agent(),
            chairman_agent: default_chairman_agent(),
            max_delegation_depth: default_max_delegation_depth(),
            max_consecutive_failures: default_max_consecutive_failures(),
            history_window: default_history_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_heartbeat_interval")]
    pub interval_secs: u64,

    /// Silence in an active meeting before the nudge agent is called
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold_secs: u64,

    #[serde(default = "default_ceo")]
    pub assignment_agent: String,

    #[serde(default = "default_ceo")]
    pub standup_agent: String,

    #[serde(default = "default_ceo")]
    pub nudge_agent: String,
}

fn default_heartbeat_interval() -> u64 {
    30
}
fn default_silence_threshold() -> u64 {
    45
}
fn default_ceo() -> String {
    "ceo-agent".into()
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_heartbeat_interval(),
            silence_threshold_secs: default_silence_threshold(),
            assignment_agent: default_ceo(),
            standup_agent: default_ceo(),
            nudge_agent: default_ceo(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    File,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory (file backend) or database file (sqlite backend).
    /// Defaults to a location under the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
        }
    }
}

impl StorageConfig {
    /// Resolved storage location for the selected backend.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match self.backend {
            StorageBackend::Sqlite => AppConfig::config_dir().join("boardroom.db"),
            StorageBackend::File | StorageBackend::Memory => AppConfig::config_dir().join("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Pause sensitive tools until the principal approves them
    #[serde(default)]
    pub require_approval: bool,

    #[serde(default = "default_sensitive_tools")]
    pub sensitive: Vec<String>,

    /// Register the persona hot-patch tool
    #[serde(default = "default_true")]
    pub allow_config_updates: bool,
}

fn default_sensitive_tools() -> Vec<String> {
    vec!["write_file".into(), "update_agent_config".into()]
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            require_approval: false,
            sensitive: default_sensitive_tools(),
            allow_config_updates: true,
        }
    }
}

/// An ordered, artifact-gated workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Goal keywords (case-insensitive) that select this workflow
    #[serde(default)]
    pub triggers: Vec<String>,

    pub steps: Vec<WorkflowStepConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStepConfig {
    pub id: String,
    pub agent_id: String,
    pub instruction: String,
    /// Exact path, or a directory prefix ending in `/`
    pub expected_artifact: String,
}

impl AppConfig {
    /// Load configuration from the default path (~/.boardroom/config.toml).
    ///
    /// Also checks environment variables:
    /// - `BOARDROOM_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `BOARDROOM_MODEL`
    /// - `BOARDROOM_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.api_key.is_none() {
            self.api_key = std::env::var("BOARDROOM_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(model) = std::env::var("BOARDROOM_MODEL") {
            self.default_model = model;
        }

        if let Ok(url) = std::env::var("BOARDROOM_API_URL") {
            self.api_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".boardroom")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.orchestrator.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "orchestrator.max_turns must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
        }

        for workflow in &self.workflows {
            if workflow.steps.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "workflow '{}' has no steps",
                    workflow.id
                )));
            }
            if let Some(step) = workflow.steps.iter().find(|s| !seen.contains(s.agent_id.as_str())) {
                return Err(ConfigError::ValidationError(format!(
                    "workflow '{}' step '{}' names unknown agent '{}'",
                    workflow.id, step.id, step.agent_id
                )));
            }
            if let Some(step) = workflow
                .steps
                .iter()
                .find(|s| normalize_path(&s.expected_artifact).is_err())
            {
                return Err(ConfigError::ValidationError(format!(
                    "workflow '{}' step '{}' expects an unusable artifact path '{}'",
                    workflow.id, step.id, step.expected_artifact
                )));
            }
        }

        if self.orchestrator.completion_policy == CompletionPolicy::StrategicReview
            && !seen.contains(self.orchestrator.review_agent.as_str())
        {
            return Err(ConfigError::ValidationError(format!(
                "review agent '{}' is not in the roster",
                self.orchestrator.review_agent
            )));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            principal_id: default_principal(),
            orchestrator: OrchestratorConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            storage: StorageConfig::default(),
            tools: ToolsConfig::default(),
            agents: roster::default_agents(),
            workflows: roster::default_workflows(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for boardroom_core::Error {
    fn from(err: ConfigError) -> Self {
        boardroom_core::Error::Config {
            message: err.to_string(),
        }
    }
}

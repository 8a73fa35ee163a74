//! Agent personas and the registry snapshot that holds them.
//!
//! A registry is a plain value handed to whoever needs it. Hot-patching a
//! persona never mutates a registry in place: [`AgentRegistry::with_overrides`]
//! and [`AgentRegistry::load_overrides`] return a fresh snapshot, and callers
//! decide when to swap it in.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::store::{ConfigOverride, ConfigStore};

/// How long an agent's private memory is meant to live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[default]
    Short,
    Midterm,
    Longterm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPolicy {
    #[serde(default)]
    pub kind: MemoryKind,
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
}

fn default_ttl_days() -> u32 {
    7
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            kind: MemoryKind::Short,
            ttl_days: default_ttl_days(),
        }
    }
}

/// A persona record. Everything except `persona` is fixed once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub role: String,

    /// Free-text instructions sent as the system prompt
    #[serde(alias = "system_prompt")]
    pub persona: String,

    /// Model override; `None` uses the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Tool allow-list. Empty means unrestricted.
    #[serde(default)]
    pub allowed_tools: Vec<String>,

    #[serde(default)]
    pub memory_policy: MemoryPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_to: Option<String>,

    #[serde(default = "default_layer")]
    pub layer: String,
}

fn default_layer() -> String {
    "operations".into()
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, role: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            persona: persona.into(),
            model_id: None,
            allowed_tools: Vec::new(),
            memory_policy: MemoryPolicy::default(),
            reports_to: None,
            layer: default_layer(),
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    pub fn with_reports_to(mut self, manager: impl Into<String>) -> Self {
        self.reports_to = Some(manager.into());
        self
    }

    pub fn with_memory(mut self, kind: MemoryKind, ttl_days: u32) -> Self {
        self.memory_policy = MemoryPolicy { kind, ttl_days };
        self
    }

    /// Whether this agent may invoke `tool`.
    pub fn allows(&self, tool: &str) -> bool {
        self.allowed_tools.is_empty() || self.allowed_tools.iter().any(|t| t == tool)
    }
}

/// An ordered, immutable set of agent profiles.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    profiles: Vec<AgentProfile>,
}

impl AgentRegistry {
    /// Build a registry. Later duplicates of an id are dropped.
    pub fn new(profiles: Vec<AgentProfile>) -> Self {
        let mut unique: Vec<AgentProfile> = Vec::with_capacity(profiles.len());
        for profile in profiles {
            if unique.iter().any(|p| p.id == profile.id) {
                warn!(agent_id = %profile.id, "Duplicate agent id in registry, keeping the first");
                continue;
            }
            unique.push(profile);
        }
        Self { profiles: unique }
    }

    pub fn get(&self, id: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Agent ids in registration order.
    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Return a new snapshot with `overrides` applied.
    ///
    /// Recognized keys are `persona` and its alias `systemPrompt`. Unknown
    /// agents and unknown keys are skipped.
    pub fn with_overrides(&self, overrides: &[ConfigOverride]) -> Self {
        let mut next = self.clone();
        for ov in overrides {
            let Some(profile) = next.profiles.iter_mut().find(|p| p.id == ov.agent_id) else {
                warn!(agent_id = %ov.agent_id, "Config override for unknown agent ignored");
                continue;
            };
            match ov.key.as_str() {
                "persona" | "systemPrompt" | "system_prompt" => {
                    debug!(agent_id = %ov.agent_id, "Applying persona override");
                    profile.persona = ov.value.clone();
                }
                other => {
                    debug!(agent_id = %ov.agent_id, key = other, "Unsupported override key ignored");
                }
            }
        }
        next
    }

    /// Read every override from `store` and return the patched snapshot.
    pub async fn load_overrides(&self, store: &dyn ConfigStore) -> Result<Self> {
        let overrides = store.list_overrides().await?;
        Ok(self.with_overrides(&overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        AgentRegistry::new(vec![
            AgentProfile::new("writer", "Writer", "You write."),
            AgentProfile::new("editor", "Editor", "You edit.").with_tools(["write_file"]),
        ])
    }

    #[test]
    fn lookup_preserves_order() {
        let reg = registry();
        assert_eq!(reg.ids(), vec!["writer", "editor"]);
        assert_eq!(reg.get("editor").unwrap().role, "Editor");
        assert!(reg.get("ghost").is_none());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let reg = AgentRegistry::new(vec![
            AgentProfile::new("a", "First", "p1"),
            AgentProfile::new("a", "Second", "p2"),
        ]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().role, "First");
    }

    #[test]
    fn empty_allow_list_permits_everything() {
        let reg = registry();
        assert!(reg.get("writer").unwrap().allows("anything"));
        assert!(reg.get("editor").unwrap().allows("write_file"));
        assert!(!reg.get("editor").unwrap().allows("dev_ticket"));
    }

    #[test]
    fn overrides_return_new_snapshot() {
        let reg = registry();
        let patched = reg.with_overrides(&[
            ConfigOverride::new("writer", "systemPrompt", "You write tersely."),
            ConfigOverride::new("ghost", "persona", "ignored"),
            ConfigOverride::new("editor", "model", "ignored"),
        ]);

        assert_eq!(patched.get("writer").unwrap().persona, "You write tersely.");
        assert_eq!(reg.get("writer").unwrap().persona, "You write.");
        assert_eq!(patched.get("editor").unwrap(), reg.get("editor").unwrap());
    }

    #[test]
    fn later_override_wins() {
        let reg = registry().with_overrides(&[
            ConfigOverride::new("writer", "persona", "v1"),
            ConfigOverride::new("writer", "persona", "v2"),
        ]);
        assert_eq!(reg.get("writer").unwrap().persona, "v2");
    }

    #[test]
    fn profile_deserializes_with_defaults() {
        let json = r#"{"id":"qa","role":"QA","system_prompt":"Test everything."}"#;
        let p: AgentProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.persona, "Test everything.");
        assert!(p.allowed_tools.is_empty());
        assert_eq!(p.memory_policy.ttl_days, 7);
        assert_eq!(p.layer, "operations");
    }
}

//! Tool trait and router.
//!
//! A [`ToolCall`] is recovered from agent text and handed to the
//! [`ToolRouter`], which looks the tool up by name and renders the outcome as
//! a plain string. Unknown names and tool failures become descriptive text so
//! every turn resolves to something printable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ToolError;

/// A JSON object payload.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A structured command recovered from an agent's free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub payload: Payload,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Build a call from any JSON value. Non-objects are wrapped as
    /// `{"value": ...}`.
    pub fn from_value(name: impl Into<String>, value: serde_json::Value) -> Self {
        let payload = match value {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Payload::new(),
            other => {
                let mut map = Payload::new();
                map.insert("value".into(), other);
                map
            }
        };
        Self::new(name, payload)
    }

    /// First string value among `keys`.
    pub fn str_arg(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.payload.get(*k).and_then(|v| v.as_str()))
    }
}

/// Who is calling a tool, and on whose behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub principal_id: String,
    pub agent_id: String,
}

impl ToolContext {
    pub fn new(principal_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            agent_id: agent_id.into(),
        }
    }
}

/// A side-effecting capability an agent can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name agents use to call this tool.
    fn name(&self) -> &str;

    /// One-line description, shown in personas and the CLI.
    fn description(&self) -> &str;

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> std::result::Result<String, ToolError>;
}

/// Maps tool names to implementations.
///
/// Tools are independent. At most one runs per turn, and none may assume
/// ordering relative to another.
#[derive(Clone, Default)]
pub struct ToolRouter {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Register under an additional name (e.g. `notepad` for `write_file`).
    pub fn register_alias(&mut self, alias: impl Into<String>, tool: Arc<dyn Tool>) {
        self.tools.insert(alias.into(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Run a call and render the outcome. Never fails.
    pub async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> ToolOutcome {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(tool = %call.name, agent_id = %ctx.agent_id, "Unknown tool requested");
            return ToolOutcome::Unknown(format!("Tool '{}' is not implemented.", call.name));
        };

        debug!(tool = %call.name, agent_id = %ctx.agent_id, "Executing tool");
        match tool.execute(call, ctx).await {
            Ok(output) => ToolOutcome::Completed(output),
            Err(e @ ToolError::AwaitingApproval { .. }) => ToolOutcome::Paused(e.to_string()),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool failed");
                ToolOutcome::Failed(format!("Error: {e}"))
            }
        }
    }
}

/// How a routed call ended. Every variant carries text for the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    Completed(String),
    /// Queued on the approval gate; nothing ran yet
    Paused(String),
    Failed(String),
    Unknown(String),
}

impl ToolOutcome {
    /// Only a completed call changed anything.
    pub fn ran(&self) -> bool {
        matches!(self, ToolOutcome::Completed(_))
    }

    pub fn text(&self) -> &str {
        match self {
            ToolOutcome::Completed(t) | ToolOutcome::Paused(t) | ToolOutcome::Failed(t) | ToolOutcome::Unknown(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ToolOutcome::Completed(t) | ToolOutcome::Paused(t) | ToolOutcome::Failed(t) | ToolOutcome::Unknown(t) => t,
        }
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRouter").field("tools", &self.names()).finish()
    }
}

//! Persona hot-patch tool.
//!
//! Writes an override to the config store. Nothing changes in running
//! sessions until a caller reloads the registry with
//! `AgentRegistry::load_overrides`.

use async_trait::async_trait;
use boardroom_core::error::ToolError;
use boardroom_core::store::ConfigStore;
use boardroom_core::tool::{Tool, ToolCall, ToolContext};
use std::sync::Arc;
use tracing::info;

pub struct UpdateAgentConfigTool {
    configs: Arc<dyn ConfigStore>,
}

impl UpdateAgentConfigTool {
    pub fn new(configs: Arc<dyn ConfigStore>) -> Self {
        Self { configs }
    }
}

#[async_trait]
impl Tool for UpdateAgentConfigTool {
    fn name(&self) -> &str {
        "update_agent_config"
    }

    fn description(&self) -> &str {
        "Change another agent's configuration. Fields: agentId, key (persona), value."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let agent_id = call
            .str_arg(&["agentId", "agent_id", "agent"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'agentId' argument".into()))?;
        let key = call
            .str_arg(&["key"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'key' argument".into()))?;
        let value = call
            .str_arg(&["value"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;

        self.configs.upsert_override(agent_id, key, value).await?;
        info!(target_agent = agent_id, key, by = %ctx.agent_id, "Agent config override stored");
        Ok(format!("Updated {key} for {agent_id}. Takes effect on the next registry reload."))
    }
}

//! Artifact write tool: save a named file into the artifact store.
//!
//! Registered as `write_file` and, for personas that think in scratch pads,
//! as `notepad` (`{filename, content}`).

use async_trait::async_trait;
use boardroom_core::error::ToolError;
use boardroom_core::store::ArtifactStore;
use boardroom_core::tool::{Tool, ToolCall, ToolContext};
use std::sync::Arc;
use tracing::info;

pub struct FileWriteTool {
    artifacts: Arc<dyn ArtifactStore>,
}

impl FileWriteTool {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }
}

/// Structured content (e.g. a JSON system map) is stored pretty-printed.
fn content_of(call: &ToolCall) -> Option<String> {
    match call.payload.get("content")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => serde_json::to_string_pretty(other).ok(),
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Save a file to the shared workspace. Overwrites an existing file with the same path."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let path = call
            .str_arg(&["path", "filename", "file"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let content = content_of(call)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;

        self.artifacts
            .save(path, &content, &ctx.agent_id, &ctx.principal_id)
            .await?;

        info!(path, agent_id = %ctx.agent_id, bytes = content.len(), "Artifact written");
        Ok(format!("Successfully wrote {} bytes to {path}", content.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_memory::InMemoryStore;
    use serde_json::json;

    fn setup() -> (Arc<InMemoryStore>, FileWriteTool) {
        let store = Arc::new(InMemoryStore::new());
        let tool = FileWriteTool::new(store.clone());
        (store, tool)
    }

    fn ctx() -> ToolContext {
        ToolContext::new("p", "writer")
    }

    #[tokio::test]
    async fn write_and_verify() {
        let (store, tool) = setup();
        let call = ToolCall::from_value("write_file", json!({"path": "draft.md", "content": "Hello from test!"}));
        let out = tool.execute(&call, &ctx()).await.unwrap();
        assert!(out.contains("16 bytes"));
        assert_eq!(store.load("draft.md", "p").await.unwrap().as_deref(), Some("Hello from test!"));
    }

    #[tokio::test]
    async fn notepad_filename_alias() {
        let (store, tool) = setup();
        let call = ToolCall::from_value("notepad", json!({"filename": "notes.txt", "content": "idea"}));
        tool.execute(&call, &ctx()).await.unwrap();
        assert!(store.load("notes.txt", "p").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn structured_content_is_pretty_json() {
        let (store, tool) = setup();
        let call = ToolCall::from_value(
            "write_file",
            json!({"path": "system_map.json", "content": {"screens": ["login"]}}),
        );
        tool.execute(&call, &ctx()).await.unwrap();
        let saved = store.load("system_map.json", "p").await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(parsed["screens"][0], "login");
    }

    #[tokio::test]
    async fn missing_arguments() {
        let (_, tool) = setup();
        let no_path = ToolCall::from_value("write_file", json!({"content": "x"}));
        assert!(matches!(
            tool.execute(&no_path, &ctx()).await,
            Err(ToolError::InvalidArguments(_))
        ));
        let no_content = ToolCall::from_value("write_file", json!({"path": "a.md"}));
        assert!(tool.execute(&no_content, &ctx()).await.is_err());
    }

    #[tokio::test]
    async fn escaping_path_is_execution_error() {
        let (_, tool) = setup();
        let call = ToolCall::from_value("write_file", json!({"path": "../x", "content": "x"}));
        let err = tool.execute(&call, &ctx()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid path"));
    }
}

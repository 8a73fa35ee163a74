//! Artifact read and list tools.

use async_trait::async_trait;
use boardroom_core::error::ToolError;
use boardroom_core::store::ArtifactStore;
use boardroom_core::tool::{Tool, ToolCall, ToolContext};
use std::sync::Arc;

/// Longest file body returned to an agent, in bytes.
const MAX_READ_BYTES: usize = 16 * 1024;

pub struct FileReadTool {
    artifacts: Arc<dyn ArtifactStore>,
}

impl FileReadTool {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the shared workspace."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let path = call
            .str_arg(&["path", "filename", "file"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        match self.artifacts.load(path, &ctx.principal_id).await? {
            Some(content) if content.len() > MAX_READ_BYTES => {
                let mut end = MAX_READ_BYTES;
                while !content.is_char_boundary(end) {
                    end -= 1;
                }
                Ok(format!(
                    "{}\n[truncated: {} of {} bytes shown]",
                    &content[..end],
                    end,
                    content.len()
                ))
            }
            Some(content) => Ok(content),
            None => Ok(format!("File '{path}' does not exist.")),
        }
    }
}

pub struct ListFilesTool {
    artifacts: Arc<dyn ArtifactStore>,
}

impl ListFilesTool {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { artifacts }
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List every file in the shared workspace."
    }

    async fn execute(&self, _call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let paths = self.artifacts.list(&ctx.principal_id).await?;
        if paths.is_empty() {
            return Ok("The workspace is empty.".into());
        }
        Ok(paths.join("\n"))
    }
}

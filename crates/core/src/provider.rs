//! Completion service trait, the seam to the external text model.
//!
//! The orchestrator assumes nothing beyond "messages in, text out". There is
//! no native function-calling contract; tool calls are recovered from the
//! returned text by the extractor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: PromptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// One request to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,

    /// Sent ahead of `messages` as the system prompt
    pub persona: String,

    pub messages: Vec<PromptMessage>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

/// Text completion backend.
///
/// Implementations must not retry internally. Retries are the caller's
/// concern and are bounded by the turn loop.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<String, ProviderError>;
}

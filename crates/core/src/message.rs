//! Conversation message types.
//!
//! A history is an append-only `Vec<ConversationMessage>`. Insertion order is
//! the only ordering guarantee; timestamps are informational.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker id used for messages typed by the human principal.
pub const USER_SPEAKER: &str = "user";

/// Speaker id used for tool output, notices and recoverable errors.
pub const SYSTEM_SPEAKER: &str = "system";

/// What kind of content a message carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Task,
    Proposal,
    System,
}

/// A single entry in a shared or per-agent conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Unique message ID (used by pollers to skip already-processed messages)
    pub id: String,

    /// `"user"`, `"system"`, or an agent id
    pub speaker_id: String,

    /// The text content
    pub content: String,

    /// When the message was appended
    pub timestamp: DateTime<Utc>,

    #[serde(default)]
    pub kind: MessageKind,
}

impl ConversationMessage {
    /// Create a message from an arbitrary speaker.
    pub fn new(speaker_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker_id: speaker_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            kind: MessageKind::Text,
        }
    }

    /// Create a message typed by the principal.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_SPEAKER, content)
    }

    /// Create a system notice (tool output, errors, team changes).
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SYSTEM_SPEAKER, content).with_kind(MessageKind::System)
    }

    /// Create a message authored by an agent.
    pub fn agent(agent_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(agent_id, content)
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_system(&self) -> bool {
        self.speaker_id == SYSTEM_SPEAKER
    }

    pub fn is_user(&self) -> bool {
        self.speaker_id == USER_SPEAKER
    }

    /// Whether an agent (not the principal or the system) wrote this.
    pub fn is_agent(&self) -> bool {
        !self.is_system() && !self.is_user()
    }
}

/// Render a history as `speaker: content` lines, oldest first.
pub fn format_transcript(history: &[ConversationMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.speaker_id, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

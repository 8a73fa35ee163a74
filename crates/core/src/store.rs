//! Persistence seams.
//!
//! Each store is a narrow trait so backends can implement only what they
//! hold. Reference backends (in-memory, JSON files, SQLite) live in
//! `boardroom-memory`; all of them treat writes as last-write-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;
use crate::message::ConversationMessage;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Per-(agent, principal) conversation memory.
///
/// `put` always receives the full list and overwrites what was there.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get(&self, agent_id: &str, principal_id: &str) -> StoreResult<Vec<ConversationMessage>>;

    async fn put(
        &self,
        agent_id: &str,
        principal_id: &str,
        messages: &[ConversationMessage],
    ) -> StoreResult<()>;
}

/// Named artifacts (files) produced by agents, scoped to a principal.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Every stored path for the principal, sorted.
    async fn list(&self, principal_id: &str) -> StoreResult<Vec<String>>;

    async fn save(&self, path: &str, content: &str, agent_id: &str, principal_id: &str) -> StoreResult<()>;

    async fn load(&self, path: &str, principal_id: &str) -> StoreResult<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    /// Lenient parse used for tool payloads. Unknown values are `Medium`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "urgent" | "critical" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Pending,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Pending => "pending",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `None` means unassigned
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn from_new(new: NewTask) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            assigned_to: new.assigned_to.filter(|a| !a.trim().is_empty()),
            priority: new.priority,
            status: TaskStatus::Open,
            created_at: Utc::now(),
        }
    }

    /// Open or in progress.
    pub fn is_active(&self) -> bool {
        matches!(self.status, TaskStatus::Open | TaskStatus::InProgress)
    }

    pub fn is_unassigned(&self) -> bool {
        match &self.assigned_to {
            None => true,
            Some(a) => a.trim().is_empty() || a.eq_ignore_ascii_case("unassigned"),
        }
    }

    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(assignee) = update.assigned_to {
            self.assigned_to = Some(assignee).filter(|a| !a.trim().is_empty());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_assignee(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_to = Some(agent_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<String>,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: NewTask) -> StoreResult<Task>;

    /// All tasks in creation order.
    async fn list(&self) -> StoreResult<Vec<Task>>;

    /// Returns the updated task, or `None` if the id is unknown.
    async fn update(&self, id: &str, update: TaskUpdate) -> StoreResult<Option<Task>>;
}

/// A persisted persona patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverride {
    pub agent_id: String,
    pub key: String,
    pub value: String,
}

impl ConfigOverride {
    pub fn new(agent_id: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            key: key.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Overrides in write order; later entries win.
    async fn list_overrides(&self) -> StoreResult<Vec<ConfigOverride>>;

    /// Insert or replace the value for (agent_id, key).
    async fn upsert_override(&self, agent_id: &str, key: &str, value: &str) -> StoreResult<()>;
}

/// Shared session transcripts, read by polling drivers.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load_history(&self, session_id: &str) -> StoreResult<Vec<ConversationMessage>>;

    async fn append_history(&self, session_id: &str, message: &ConversationMessage) -> StoreResult<()>;
}

/// Normalize an artifact path to `a/b/c` form.
///
/// Leading `./` and `/` are dropped and backslashes become `/`. Empty paths
/// and `..` components are rejected so no backend can escape its root.
pub fn normalize_path(path: &str) -> StoreResult<String> {
    let unified = path.trim().replace('\\', "/");
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(StoreError::InvalidPath(path.to_string())),
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

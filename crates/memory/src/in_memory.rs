//! In-memory store, useful for testing and ephemeral sessions.

use async_trait::async_trait;
use boardroom_core::error::StoreError;
use boardroom_core::message::ConversationMessage;
use boardroom_core::store::{
    ArtifactStore, ConfigOverride, ConfigStore, HistoryStore, MemoryStore, NewTask, Task,
    TaskStore, TaskUpdate,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::normalize_path;

type Scope = (String, String);

/// Holds every store in process memory. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    memories: Arc<RwLock<HashMap<Scope, Vec<ConversationMessage>>>>,
    // principal -> path -> content
    artifacts: Arc<RwLock<HashMap<String, BTreeMap<String, String>>>>,
    tasks: Arc<RwLock<Vec<Task>>>,
    configs: Arc<RwLock<Vec<ConfigOverride>>>,
    histories: Arc<RwLock<HashMap<String, Vec<ConversationMessage>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, agent_id: &str, principal_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        let memories = self.memories.read().await;
        Ok(memories
            .get(&(agent_id.to_string(), principal_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn put(
        &self,
        agent_id: &str,
        principal_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), StoreError> {
        self.memories
            .write()
            .await
            .insert((agent_id.to_string(), principal_id.to_string()), messages.to_vec());
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryStore {
    async fn list(&self, principal_id: &str) -> Result<Vec<String>, StoreError> {
        let artifacts = self.artifacts.read().await;
        Ok(artifacts
            .get(principal_id)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn save(&self, path: &str, content: &str, _agent_id: &str, principal_id: &str) -> Result<(), StoreError> {
        let path = normalize_path(path)?;
        self.artifacts
            .write()
            .await
            .entry(principal_id.to_string())
            .or_default()
            .insert(path, content.to_string());
        Ok(())
    }

    async fn load(&self, path: &str, principal_id: &str) -> Result<Option<String>, StoreError> {
        let path = normalize_path(path)?;
        let artifacts = self.artifacts.read().await;
        Ok(artifacts.get(principal_id).and_then(|files| files.get(&path).cloned()))
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn create(&self, task: NewTask) -> Result<Task, StoreError> {
        let task = Task::from_new(task);
        self.tasks.write().await.push(task.clone());
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.read().await.clone())
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.apply(update);
            task.clone()
        }))
    }
}

#[async_trait]
impl ConfigStore for InMemoryStore {
    async fn list_overrides(&self) -> Result<Vec<ConfigOverride>, StoreError> {
        Ok(self.configs.read().await.clone())
    }

    async fn upsert_override(&self, agent_id: &str, key: &str, value: &str) -> Result<(), StoreError> {
        let mut configs = self.configs.write().await;
        // Re-append so the newest write sorts last
        configs.retain(|c| !(c.agent_id == agent_id && c.key == key));
        configs.push(ConfigOverride::new(agent_id, key, value));
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryStore {
    async fn load_history(&self, session_id: &str) -> Result<Vec<ConversationMessage>, StoreError> {
        Ok(self
            .histories
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append_history(&self, session_id: &str, message: &ConversationMessage) -> Result<(), StoreError> {
        self.histories
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }
}

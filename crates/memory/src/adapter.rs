//! Memory adapter: one agent's conversation log for one principal.

use boardroom_core::error::StoreError;
use boardroom_core::message::ConversationMessage;
use boardroom_core::store::MemoryStore;
use std::sync::Arc;
use tracing::debug;

/// A scoped handle over a [`MemoryStore`].
///
/// Writes are wholesale: `save` always sends the full list, so the store
/// holds exactly what the runtime last saw.
#[derive(Clone)]
pub struct AgentMemory {
    store: Arc<dyn MemoryStore>,
    agent_id: String,
    principal_id: String,
}

impl AgentMemory {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        agent_id: impl Into<String>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            agent_id: agent_id.into(),
            principal_id: principal_id.into(),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    /// Load the persisted log. Never-written scopes are empty.
    pub async fn load(&self) -> Result<Vec<ConversationMessage>, StoreError> {
        let messages = self.store.get(&self.agent_id, &self.principal_id).await?;
        debug!(agent_id = %self.agent_id, principal_id = %self.principal_id, count = messages.len(), "Loaded agent memory");
        Ok(messages)
    }

    /// Overwrite the persisted log with `messages`.
    pub async fn save(&self, messages: &[ConversationMessage]) -> Result<(), StoreError> {
        self.store.put(&self.agent_id, &self.principal_id, messages).await
    }
}

impl std::fmt::Debug for AgentMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentMemory")
            .field("agent_id", &self.agent_id)
            .field("principal_id", &self.principal_id)
            .finish()
    }
}

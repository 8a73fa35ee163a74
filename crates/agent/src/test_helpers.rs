//! Shared test doubles for runtime, orchestrator and loop tests.

use async_trait::async_trait;
use boardroom_core::error::{ProviderError, StoreError};
use boardroom_core::message::ConversationMessage;
use boardroom_core::provider::{CompletionRequest, CompletionService};
use boardroom_core::store::{MemoryStore, StoreResult};
use std::sync::Mutex;

/// Returns scripted responses in order and records every request.
///
/// Panics if more calls are made than responses provided.
pub struct ScriptedCompletion {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "ScriptedCompletion: no more responses (call #{}, have {})",
                index,
                responses.len()
            );
        }
        requests.push(request);
        responses[index].clone()
    }
}

/// A memory store whose writes always fail.
pub struct FailingMemory;

#[async_trait]
impl MemoryStore for FailingMemory {
    async fn get(&self, _agent_id: &str, _principal_id: &str) -> StoreResult<Vec<ConversationMessage>> {
        Ok(Vec::new())
    }

    async fn put(&self, _agent_id: &str, _principal_id: &str, _messages: &[ConversationMessage]) -> StoreResult<()> {
        Err(StoreError::Storage("disk full".into()))
    }
}

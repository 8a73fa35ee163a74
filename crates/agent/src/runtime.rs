//! A single agent's live conversational state.

use crate::delegation::Delegate;
use crate::extractor::extract_tool_call;
use crate::ledger::LastAction;
use boardroom_config::AppConfig;
use boardroom_core::error::Result;
use boardroom_core::event::{DomainEvent, EventBus};
use boardroom_core::message::{ConversationMessage, SYSTEM_SPEAKER};
use boardroom_core::profile::AgentProfile;
use boardroom_core::provider::{CompletionRequest, CompletionService, PromptMessage, PromptRole};
use boardroom_core::tool::{ToolCall, ToolContext, ToolRouter};
use boardroom_memory::AgentMemory;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tool name that routes to the delegation subsystem instead of the router.
pub const DELEGATE_TOOL: &str = "delegate";

/// Model and sampling defaults shared by every runtime a factory builds.
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub default_model: String,
    pub temperature: f32,
    pub max_delegation_depth: u32,
}

impl RuntimeSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_delegation_depth: config.orchestrator.max_delegation_depth,
        }
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub extract_tools: bool,
}

impl SendOptions {
    /// Text only; model output is never scanned for commands.
    pub fn text_only() -> Self {
        Self { extract_tools: false }
    }
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { extract_tools: true }
    }
}

/// Everything one turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub text: String,
    pub tool_call: Option<ToolCall>,
    pub tool_result: Option<String>,
    pub delegated_to: Option<String>,
    /// What actually executed, for the anti-repeat ledger
    pub action: LastAction,
}

impl TurnOutput {
    fn text(text: String) -> Self {
        Self {
            text,
            tool_call: None,
            tool_result: None,
            delegated_to: None,
            action: LastAction::Conversational,
        }
    }
}

pub struct AgentRuntime {
    profile: AgentProfile,
    principal_id: String,
    depth: u32,
    settings: RuntimeSettings,
    completion: Arc<dyn CompletionService>,
    memory: AgentMemory,
    tools: ToolRouter,
    delegation: Option<Arc<dyn Delegate>>,
    events: Arc<EventBus>,
    history: Vec<ConversationMessage>,
    /// Length of the stored list as of the last load or save
    stored_len: usize,
    loaded: bool,
}

impl AgentRuntime {
    pub fn new(
        profile: AgentProfile,
        principal_id: impl Into<String>,
        completion: Arc<dyn CompletionService>,
        memory: AgentMemory,
        tools: ToolRouter,
        settings: RuntimeSettings,
    ) -> Self {
        Self {
            profile,
            principal_id: principal_id.into(),
            depth: 0,
            settings,
            completion,
            memory,
            tools,
            delegation: None,
            events: Arc::new(EventBus::default()),
            history: Vec::new(),
            stored_len: 0,
            loaded: false,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_delegation(mut self, delegation: Arc<dyn Delegate>) -> Self {
        self.delegation = Some(delegation);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn agent_id(&self) -> &str {
        &self.profile.id
    }

    pub fn principal_id(&self) -> &str {
        &self.principal_id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn history(&self) -> &[ConversationMessage] {
        &self.history
    }

    /// Load persisted memory once. Later calls do nothing.
    pub async fn init(&mut self) {
        if self.loaded {
            return;
        }
        match self.memory.load().await {
            Ok(history) => self.history = history,
            Err(e) => {
                warn!(agent_id = %self.profile.id, error = %e, "Could not load agent memory, starting empty");
                self.history.clear();
            }
        }
        self.stored_len = self.history.len();
        self.loaded = true;
    }

    /// Pick up turns another runtime saved under this agent's scope since
    /// the last load or save, such as a delegated exchange.
    ///
    /// Messages this runtime holds but never saved (the last tool result)
    /// stay between the saved prefix and the newer stored turns. A failed
    /// read keeps the current history.
    pub async fn refresh(&mut self) {
        if !self.loaded {
            self.init().await;
            return;
        }
        let mut stored = match self.memory.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(agent_id = %self.profile.id, error = %e, "Could not refresh agent memory, keeping current history");
                return;
            }
        };
        if stored.len() <= self.stored_len {
            return;
        }

        let total = stored.len();
        let newer = stored.split_off(self.stored_len);
        debug!(agent_id = %self.profile.id, count = newer.len(), "Merged turns saved elsewhere");
        self.history.extend(newer);
        self.stored_len = total;
    }

    /// Run one turn: prompt the model, persist, then act on any tool call.
    ///
    /// A failed completion leaves history as it was before the call.
    pub async fn send_message(&mut self, text: &str, options: SendOptions) -> Result<TurnOutput> {
        self.history.push(ConversationMessage::user(text));

        let request = CompletionRequest {
            model: self
                .profile
                .model_id
                .clone()
                .unwrap_or_else(|| self.settings.default_model.clone()),
            persona: self.profile.persona.clone(),
            messages: self.prompt_messages(),
            temperature: self.settings.temperature,
        };

        debug!(agent_id = %self.profile.id, model = %request.model, messages = request.messages.len(), "Requesting completion");
        let raw = match self.completion.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                self.history.pop();
                warn!(agent_id = %self.profile.id, error = %e, "Completion failed");
                return Err(e.into());
            }
        };

        self.history.push(ConversationMessage::agent(&self.profile.id, &raw));
        self.persist().await;

        let call = if options.extract_tools {
            extract_tool_call(&raw)
        } else {
            None
        };
        let mut output = TurnOutput::text(raw);
        if let Some(call) = call {
            self.dispatch(call, &mut output).await;
        }
        Ok(output)
    }

    fn prompt_messages(&self) -> Vec<PromptMessage> {
        self.history
            .iter()
            .map(|m| {
                let role = if m.speaker_id == self.profile.id {
                    PromptRole::Assistant
                } else if m.speaker_id == SYSTEM_SPEAKER {
                    PromptRole::System
                } else {
                    PromptRole::User
                };
                PromptMessage::new(role, &m.content)
            })
            .collect()
    }

    async fn persist(&mut self) {
        match self.memory.save(&self.history).await {
            Ok(()) => self.stored_len = self.history.len(),
            Err(e) => {
                warn!(agent_id = %self.profile.id, error = %e, "Failed to persist agent memory");
                self.events.publish(DomainEvent::PersistenceFailed {
                    agent_id: self.profile.id.clone(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    async fn dispatch(&mut self, call: ToolCall, output: &mut TurnOutput) {
        let result = if call.name == DELEGATE_TOOL {
            self.delegate(&call, output).await
        } else if !self.profile.allows(&call.name) {
            warn!(agent_id = %self.profile.id, tool = %call.name, "Tool not in allow-list");
            format!(
                "Agent '{}' is not allowed to use tool '{}'.",
                self.profile.id, call.name
            )
        } else {
            self.run_tool(&call, output).await
        };

        self.history.push(ConversationMessage::system(format!(
            "Tool Result ({}): {result}",
            call.name
        )));
        output.tool_result = Some(result);
        output.tool_call = Some(call);
    }

    async fn run_tool(&self, call: &ToolCall, output: &mut TurnOutput) -> String {
        let ctx = ToolContext::new(&self.principal_id, &self.profile.id);
        let started = Instant::now();
        let outcome = self.tools.execute(call, &ctx).await;

        // failed, paused and unknown calls stay conversational
        if outcome.ran() {
            let duration_ms = started.elapsed().as_millis() as u64;
            info!(agent_id = %self.profile.id, tool = %call.name, duration_ms, "Tool executed");
            self.events.publish(DomainEvent::ToolExecuted {
                tool_name: call.name.clone(),
                agent_id: self.profile.id.clone(),
                duration_ms,
                timestamp: Utc::now(),
            });
            output.action = LastAction::Concrete {
                tool: call.name.clone(),
            };
        }
        outcome.into_text()
    }

    async fn delegate(&self, call: &ToolCall, output: &mut TurnOutput) -> String {
        let Some(delegation) = &self.delegation else {
            return "Error: delegation is not available to this agent.".into();
        };
        let outcome = delegation
            .delegate(&self.profile, self.depth, &self.principal_id, call)
            .await;
        if let Some(target) = &outcome.target {
            self.events.publish(DomainEvent::DelegationCompleted {
                from_agent: self.profile.id.clone(),
                to_agent: target.clone(),
                timestamp: Utc::now(),
            });
            output.action = LastAction::Delegated {
                target: target.clone(),
            };
        }
        output.delegated_to = outcome.target;
        outcome.text
    }
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("agent_id", &self.profile.id)
            .field("principal_id", &self.principal_id)
            .field("depth", &self.depth)
            .field("history", &self.history.len())
            .finish()
    }
}

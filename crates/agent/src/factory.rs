//! Runtime construction.
//!
//! Everything that builds an [`AgentRuntime`] (the orchestrator's chairman,
//! the turn loop, delegation) goes through an injected factory, so tests can
//! swap the collaborators without touching the callers.

use crate::delegation::Delegator;
use crate::runtime::{AgentRuntime, RuntimeSettings};
use boardroom_core::event::EventBus;
use boardroom_core::profile::{AgentProfile, AgentRegistry};
use boardroom_core::provider::CompletionService;
use boardroom_core::store::MemoryStore;
use boardroom_core::tool::ToolRouter;
use boardroom_memory::AgentMemory;
use std::sync::{Arc, Weak};

pub trait AgentRuntimeFactory: Send + Sync {
    /// Build an uninitialized runtime. Callers run `init` themselves.
    fn create(&self, profile: &AgentProfile, principal_id: &str, depth: u32) -> AgentRuntime;
}

/// Builds runtimes that share one completion service, memory store and tool
/// router. Each runtime gets a delegation handle pointing back here.
pub struct DefaultRuntimeFactory {
    me: Weak<DefaultRuntimeFactory>,
    completion: Arc<dyn CompletionService>,
    memory: Arc<dyn MemoryStore>,
    tools: ToolRouter,
    registry: Arc<AgentRegistry>,
    settings: RuntimeSettings,
    events: Arc<EventBus>,
}

impl DefaultRuntimeFactory {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        memory: Arc<dyn MemoryStore>,
        tools: ToolRouter,
        registry: Arc<AgentRegistry>,
        settings: RuntimeSettings,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            completion,
            memory,
            tools,
            registry,
            settings,
            events,
        })
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }
}

impl AgentRuntimeFactory for DefaultRuntimeFactory {
    fn create(&self, profile: &AgentProfile, principal_id: &str, depth: u32) -> AgentRuntime {
        let me: Weak<dyn AgentRuntimeFactory> = self.me.clone();
        let delegator = Delegator::new(self.registry.clone(), me, self.settings.max_delegation_depth);

        AgentRuntime::new(
            profile.clone(),
            principal_id,
            self.completion.clone(),
            AgentMemory::new(self.memory.clone(), &profile.id, principal_id),
            self.tools.clone(),
            self.settings.clone(),
        )
        .with_depth(depth)
        .with_delegation(Arc::new(delegator))
        .with_events(self.events.clone())
    }
}

impl std::fmt::Debug for DefaultRuntimeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultRuntimeFactory")
            .field("completion", &self.completion.name())
            .field("agents", &self.registry.len())
            .field("tools", &self.tools)
            .finish()
    }
}

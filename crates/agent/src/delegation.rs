//! Delegation: one agent hands a sub-instruction to another and waits.
//!
//! Every failure mode comes back as text for the delegator's turn result.
//! Nothing here returns an error to the caller.

use crate::factory::AgentRuntimeFactory;
use crate::runtime::SendOptions;
use async_trait::async_trait;
use boardroom_core::profile::{AgentProfile, AgentRegistry};
use boardroom_core::tool::ToolCall;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationOutcome {
    /// Set only when the delegate actually ran a turn
    pub target: Option<String>,
    pub text: String,
}

impl DelegationOutcome {
    fn failed(text: impl Into<String>) -> Self {
        Self {
            target: None,
            text: text.into(),
        }
    }
}

/// Handle a runtime uses to run a `delegate` call.
#[async_trait]
pub trait Delegate: Send + Sync {
    async fn delegate(
        &self,
        from: &AgentProfile,
        depth: u32,
        principal_id: &str,
        call: &ToolCall,
    ) -> DelegationOutcome;
}

pub struct Delegator {
    registry: Arc<AgentRegistry>,
    factory: Weak<dyn AgentRuntimeFactory>,
    max_depth: u32,
}

impl Delegator {
    pub fn new(registry: Arc<AgentRegistry>, factory: Weak<dyn AgentRuntimeFactory>, max_depth: u32) -> Self {
        Self {
            registry,
            factory,
            max_depth,
        }
    }
}

#[async_trait]
impl Delegate for Delegator {
    async fn delegate(
        &self,
        from: &AgentProfile,
        depth: u32,
        principal_id: &str,
        call: &ToolCall,
    ) -> DelegationOutcome {
        let Some(target_id) = call.str_arg(&["agent", "agentId", "target"]) else {
            return DelegationOutcome::failed("Error: delegate requires an 'agent' to hand the work to.");
        };
        let Some(instruction) = call.str_arg(&["instruction", "task", "message"]) else {
            return DelegationOutcome::failed("Error: delegate requires an 'instruction'.");
        };
        if target_id == from.id {
            return DelegationOutcome::failed("Error: an agent cannot delegate to itself.");
        }
        if depth >= self.max_depth {
            warn!(from = %from.id, to = target_id, depth, "Delegation depth limit reached");
            return DelegationOutcome::failed(format!(
                "Error: delegation depth limit ({}) reached; do the work yourself.",
                self.max_depth
            ));
        }
        let Some(target) = self.registry.get(target_id) else {
            return DelegationOutcome::failed(format!("Error: unknown agent '{target_id}'."));
        };
        let Some(factory) = self.factory.upgrade() else {
            return DelegationOutcome::failed("Error: no runtime factory is available for delegation.");
        };

        info!(from = %from.id, to = %target.id, depth, "Delegating");
        let mut runtime = factory.create(target, principal_id, depth + 1);
        runtime.init().await;

        match runtime.send_message(instruction, SendOptions::default()).await {
            Ok(output) => DelegationOutcome {
                target: Some(target.id.clone()),
                text: format!("[Delegated to {} ({})]: {}", target.role, target.id, output.text),
            },
            Err(e) => {
                warn!(from = %from.id, to = %target.id, error = %e, "Delegate turn failed");
                DelegationOutcome::failed(format!("Error: delegation to '{}' failed: {e}", target.id))
            }
        }
    }
}

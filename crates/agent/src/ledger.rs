//! What each agent actually did on its last turn.
//!
//! Recorded from execution results, never from the agent's wording, so the
//! anti-repeat guard cannot be talked out of firing.

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastAction {
    /// A registered tool ran
    Concrete { tool: String },
    /// Work was handed to another agent
    Delegated { target: String },
    /// Text only, or a tool request that was refused or unknown
    Conversational,
}

impl LastAction {
    /// Delegation counts: the agent moved work forward.
    pub fn is_concrete(&self) -> bool {
        !matches!(self, LastAction::Conversational)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActionLedger {
    last: HashMap<String, LastAction>,
}

impl ActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, agent_id: &str, action: LastAction) {
        self.last.insert(agent_id.to_string(), action);
    }

    pub fn get(&self, agent_id: &str) -> Option<&LastAction> {
        self.last.get(agent_id)
    }

    /// True when the agent has done something concrete most recently.
    /// Agents with nothing recorded are treated as conversational.
    pub fn acted(&self, agent_id: &str) -> bool {
        self.get(agent_id).is_some_and(LastAction::is_concrete)
    }
}

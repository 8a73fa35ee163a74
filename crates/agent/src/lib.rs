//! Multi-agent turn-taking for the boardroom.
//!
//! The pieces, bottom-up:
//!
//! 1. [`extractor`] pulls one tool call out of free-form model text
//! 2. [`runtime::AgentRuntime`] runs a single agent's turn against its own
//!    memory, executing whatever tool call the reply carries
//! 3. [`delegation`] lets a turn hand a sub-instruction to another agent
//! 4. [`orchestrator::Orchestrator`] decides who speaks next
//! 5. [`turn_loop::TurnLoop`] drives decide/act iterations under a turn cap
//! 6. [`poller::Poller`] advances a persisted session one step per new message

pub mod delegation;
pub mod extractor;
pub mod factory;
pub mod ledger;
pub mod orchestrator;
pub mod poller;
pub mod runtime;
pub mod turn_loop;

#[cfg(test)]
mod test_helpers;

pub use delegation::{Delegate, DelegationOutcome, Delegator};
pub use extractor::extract_tool_call;
pub use factory::{AgentRuntimeFactory, DefaultRuntimeFactory};
pub use ledger::{ActionLedger, LastAction};
pub use orchestrator::{DecisionContext, Orchestrator, parse_decision, previous_agent_speaker};
pub use poller::{PollOutcome, Poller, SingleFlight};
pub use runtime::{AgentRuntime, DELEGATE_TOOL, RuntimeSettings, SendOptions, TurnOutput};
pub use turn_loop::{LoopOutcome, Session, StepOutcome, TurnLoop};

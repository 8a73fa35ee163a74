//! The turn loop driver.
//!
//! One logical sequence per goal: ask the orchestrator, run the chosen
//! agent's turn, append the result to shared history, repeat. The loop is
//! bounded by `max_turns`; reaching it suspends the session rather than
//! failing it, and [`TurnLoop::resume`] grants a fresh allowance.

use crate::factory::AgentRuntimeFactory;
use crate::ledger::ActionLedger;
use crate::orchestrator::{DecisionContext, Orchestrator};
use crate::runtime::{AgentRuntime, SendOptions, TurnOutput};
use boardroom_core::decision::{OrchestrationDecision, TeamAction, TeamChange};
use boardroom_core::error::Result;
use boardroom_core::event::{DomainEvent, EventBus};
use boardroom_core::message::{format_transcript, ConversationMessage};
use boardroom_core::profile::AgentProfile;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state of one orchestration session.
#[derive(Debug, Clone)]
pub struct Session {
    pub goal: String,
    pub history: Vec<ConversationMessage>,
    pub active_agents: Vec<String>,
    pub company_state: serde_json::Value,
    pub autonomous: bool,
    pub ledger: ActionLedger,
    /// Iterations used since the last start or resume
    pub turns: u32,
    pub consecutive_failures: u32,
}

impl Session {
    /// A session whose history opens with the goal as a user message.
    pub fn new(goal: impl Into<String>) -> Self {
        let goal = goal.into();
        Self {
            history: vec![ConversationMessage::user(&goal)],
            goal,
            active_agents: Vec::new(),
            company_state: serde_json::json!({}),
            autonomous: false,
            ledger: ActionLedger::new(),
            turns: 0,
            consecutive_failures: 0,
        }
    }

    pub fn with_agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active_agents = agents.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_company_state(mut self, state: serde_json::Value) -> Self {
        self.company_state = state;
        self
    }

    pub fn with_autonomous(mut self, autonomous: bool) -> Self {
        self.autonomous = autonomous;
        self
    }

    /// A fresh turn allowance after a suspension.
    pub fn reset_allowance(&mut self) {
        self.turns = 0;
        self.consecutive_failures = 0;
    }

    fn note(&mut self, text: impl Into<String>) {
        self.history.push(ConversationMessage::system(text));
    }
}

/// Result of a single iteration.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Spoke { agent_id: String, output: TurnOutput },
    /// The decision could not be carried out; a note was added to history
    Recovered { note: String },
    Terminated { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    Terminated { reason: String, turns: u32 },
    /// The iteration cap was reached; `resume` continues
    Suspended { turns: u32 },
    /// Too many consecutive transport failures
    Failed { error: String, turns: u32 },
}

pub struct TurnLoop {
    orchestrator: Orchestrator,
    factory: Arc<dyn AgentRuntimeFactory>,
    principal_id: String,
    runtimes: HashMap<String, AgentRuntime>,
    max_turns: u32,
    max_consecutive_failures: u32,
    history_window: usize,
    events: Arc<EventBus>,
}

impl TurnLoop {
    pub fn new(
        orchestrator: Orchestrator,
        factory: Arc<dyn AgentRuntimeFactory>,
        principal_id: impl Into<String>,
    ) -> Self {
        let config = orchestrator.config();
        Self {
            max_turns: config.max_turns,
            max_consecutive_failures: config.max_consecutive_failures.max(1),
            history_window: config.history_window,
            orchestrator,
            factory,
            principal_id: principal_id.into(),
            runtimes: HashMap::new(),
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// One iteration: decide, then act on the decision.
    ///
    /// Transport errors are returned; `run` decides whether to retry.
    pub async fn step(&mut self, session: &mut Session) -> Result<StepOutcome> {
        let decision = {
            let ctx = DecisionContext {
                goal: &session.goal,
                history: &session.history,
                active_agents: &session.active_agents,
                company_state: &session.company_state,
                autonomous: session.autonomous,
                ledger: &session.ledger,
            };
            self.orchestrator.decide(&ctx).await?
        };

        if decision.is_terminate() {
            info!(reason = %decision.reason, "Session terminated by orchestrator");
            return Ok(StepOutcome::Terminated {
                reason: decision.reason,
            });
        }

        if let Some(change) = &decision.team_change {
            self.apply_team_change(session, change);
        }

        let registry = self.orchestrator.registry().clone();
        let Some(profile) = registry.get(&decision.next_speaker_id) else {
            let note = format!(
                "Agent '{}' is not available. Choose one of the listed agents.",
                decision.next_speaker_id
            );
            warn!(agent_id = %decision.next_speaker_id, "Decision named an unknown agent");
            session.note(&note);
            session.turns += 1;
            return Ok(StepOutcome::Recovered { note });
        };

        let prompt = compose_prompt(session, &decision, self.history_window);
        let runtime = self.runtime_for(profile).await;
        let output = runtime.send_message(&prompt, SendOptions::default()).await?;

        session.turns += 1;
        session.history.push(ConversationMessage::agent(&profile.id, &output.text));
        if let (Some(call), Some(result)) = (&output.tool_call, &output.tool_result) {
            session.note(format!("Tool Result ({}): {result}", call.name));
        }
        session.ledger.record(&profile.id, output.action.clone());

        debug!(agent_id = %profile.id, turn = session.turns, "Turn completed");
        self.events.publish(DomainEvent::TurnCompleted {
            agent_id: profile.id.clone(),
            turn: session.turns,
            tool: output.tool_call.as_ref().map(|c| c.name.clone()),
            timestamp: Utc::now(),
        });

        Ok(StepOutcome::Spoke {
            agent_id: profile.id.clone(),
            output,
        })
    }

    pub async fn run(&mut self, session: &mut Session) -> Result<LoopOutcome> {
        self.run_with(session, |_| {}).await
    }

    /// Like [`TurnLoop::run`], calling `observe` after every iteration.
    pub async fn run_with<F>(&mut self, session: &mut Session, mut observe: F) -> Result<LoopOutcome>
    where
        F: FnMut(&StepOutcome),
    {
        loop {
            if session.turns >= self.max_turns {
                info!(turns = session.turns, "Turn cap reached, suspending");
                self.events.publish(DomainEvent::LoopSuspended {
                    turns: session.turns,
                    timestamp: Utc::now(),
                });
                return Ok(LoopOutcome::Suspended { turns: session.turns });
            }

            match self.step(session).await {
                Ok(StepOutcome::Terminated { reason }) => {
                    observe(&StepOutcome::Terminated { reason: reason.clone() });
                    return Ok(LoopOutcome::Terminated {
                        reason,
                        turns: session.turns,
                    });
                }
                Ok(outcome) => {
                    if matches!(outcome, StepOutcome::Spoke { .. }) {
                        session.consecutive_failures = 0;
                    }
                    observe(&outcome);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    session.turns += 1;
                    session.consecutive_failures += 1;
                    warn!(error = %e, failures = session.consecutive_failures, "Turn failed");
                    let note = format!("Turn failed: {e}");
                    session.note(&note);
                    observe(&StepOutcome::Recovered { note });

                    if session.consecutive_failures >= self.max_consecutive_failures {
                        return Ok(LoopOutcome::Failed {
                            error: e.to_string(),
                            turns: session.turns,
                        });
                    }
                }
            }
        }
    }

    /// Continue a suspended session with a fresh turn allowance.
    pub async fn resume(&mut self, session: &mut Session) -> Result<LoopOutcome> {
        session.reset_allowance();
        self.run(session).await
    }

    async fn runtime_for(&mut self, profile: &AgentProfile) -> &mut AgentRuntime {
        let runtime = self
            .runtimes
            .entry(profile.id.clone())
            .or_insert_with(|| self.factory.create(profile, &self.principal_id, 0));
        // delegation writes this agent's memory through its own runtime
        runtime.refresh().await;
        runtime
    }

    fn apply_team_change(&self, session: &mut Session, change: &TeamChange) {
        let registry = self.orchestrator.registry();
        match change.action {
            TeamAction::Add => {
                let Some(profile) = registry.get(&change.agent_id) else {
                    warn!(agent_id = %change.agent_id, "Cannot add unknown agent");
                    session.note(format!("Cannot add unknown agent '{}'.", change.agent_id));
                    return;
                };
                if !session.active_agents.contains(&change.agent_id) {
                    info!(agent_id = %change.agent_id, "Agent joined the session");
                    session.active_agents.push(change.agent_id.clone());
                    session.note(format!("{} joined the meeting. {}", profile.role, change.reason).trim_end());
                }
            }
            TeamAction::Remove => {
                if session.active_agents.contains(&change.agent_id) {
                    info!(agent_id = %change.agent_id, "Agent left the session");
                    session.active_agents.retain(|id| id != &change.agent_id);
                    session.note(format!("{} left the meeting. {}", change.agent_id, change.reason).trim_end());
                }
            }
        }
    }
}

/// The message an agent receives for its turn.
fn compose_prompt(session: &Session, decision: &OrchestrationDecision, window: usize) -> String {
    let recent = &session.history[session.history.len().saturating_sub(window)..];
    let instruction = if decision.instruction.trim().is_empty() {
        "Contribute your next concrete step toward the goal."
    } else {
        decision.instruction.as_str()
    };
    format!(
        "GOAL: {}\n\nRECENT DISCUSSION:\n{}\n\nYOUR INSTRUCTION: {instruction}",
        session.goal,
        format_transcript(recent)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::DefaultRuntimeFactory;
    use crate::runtime::RuntimeSettings;
    use crate::test_helpers::ScriptedCompletion;
    use boardroom_config::OrchestratorConfig;
    use boardroom_core::error::{Error, ProviderError};
    use boardroom_core::profile::AgentRegistry;
    use boardroom_core::tool::ToolRouter;
    use boardroom_memory::InMemoryStore;

    fn pick(agent: &str) -> String {
        format!(r#"{{"nextSpeakerId": "{agent}", "reason": "next", "instruction": "Go."}}"#)
    }

    const TERMINATE_JSON: &str = r#"{"nextSpeakerId": "TERMINATE", "reason": "Goal met."}"#;

    fn driver(responses: Vec<std::result::Result<String, ProviderError>>) -> (TurnLoop, Arc<ScriptedCompletion>) {
        let (tl, completion, _) = driver_with_store(responses);
        (tl, completion)
    }

    fn driver_with_store(
        responses: Vec<std::result::Result<String, ProviderError>>,
    ) -> (TurnLoop, Arc<ScriptedCompletion>, Arc<InMemoryStore>) {
        let completion = Arc::new(ScriptedCompletion::new(responses));
        let store = Arc::new(InMemoryStore::new());
        let registry = Arc::new(AgentRegistry::new(vec![
            AgentProfile::new("agent-a", "Agent A", "A."),
            AgentProfile::new("agent-b", "Agent B", "B."),
        ]));
        let factory = DefaultRuntimeFactory::new(
            completion.clone(),
            store.clone(),
            ToolRouter::new(),
            registry.clone(),
            RuntimeSettings::default(),
            Arc::new(EventBus::default()),
        );
        let config = OrchestratorConfig {
            max_turns: 2,
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(registry, factory.clone(), store.clone(), "p").with_config(config);
        (TurnLoop::new(orchestrator, factory, "p"), completion, store)
    }

    fn texts(items: &[&str]) -> Vec<std::result::Result<String, ProviderError>> {
        items.iter().map(|t| Ok(t.to_string())).collect()
    }

    #[tokio::test]
    async fn terminate_short_circuits() {
        let (mut tl, completion) = driver(texts(&[TERMINATE_JSON]));
        let mut session = Session::new("Plan").with_agents(["agent-a"]);
        let outcome = tl.run(&mut session).await.unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Terminated {
                reason: "Goal met.".into(),
                turns: 0
            }
        );
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn cap_suspends_and_resume_continues() {
        let (a, b) = (pick("agent-a"), pick("agent-b"));
        let (mut tl, completion) = driver(texts(&[&a, "A speaks.", &b, "B speaks.", TERMINATE_JSON]));
        let mut session = Session::new("Plan").with_agents(["agent-a", "agent-b"]);

        let outcome = tl.run(&mut session).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Suspended { turns: 2 });
        assert_eq!(completion.call_count(), 4);
        let speakers: Vec<&str> = session.history.iter().map(|m| m.speaker_id.as_str()).collect();
        assert_eq!(speakers, vec!["user", "agent-a", "agent-b"]);

        let outcome = tl.resume(&mut session).await.unwrap();
        assert!(matches!(outcome, LoopOutcome::Terminated { turns: 0, .. }));
        assert_eq!(completion.call_count(), 5);
    }

    #[tokio::test]
    async fn unknown_speaker_is_recoverable() {
        let ghost = pick("ghost-agent");
        let (mut tl, _) = driver(texts(&[&ghost, TERMINATE_JSON]));
        let mut session = Session::new("Plan").with_agents(["agent-a"]);

        let outcome = tl.run(&mut session).await.unwrap();
        assert!(matches!(outcome, LoopOutcome::Terminated { turns: 1, .. }));
        let note = session.history.last().unwrap();
        assert!(note.is_system());
        assert!(note.content.contains("'ghost-agent' is not available"));
    }

    #[tokio::test]
    async fn team_change_updates_active_set() {
        let add_b = r#"{"nextSpeakerId": "agent-b", "reason": "need B", "instruction": "Help.",
            "manageTeam": {"action": "ADD", "agentId": "agent-b", "reason": "B knows this"}}"#;
        let (mut tl, _) = driver(texts(&[add_b, "Happy to help.", TERMINATE_JSON]));
        let mut session = Session::new("Plan").with_agents(["agent-a"]);

        tl.run(&mut session).await.unwrap();
        assert_eq!(session.active_agents, vec!["agent-a", "agent-b"]);
        assert!(session.history.iter().any(|m| m.content.starts_with("Agent B joined the meeting.")));
    }

    #[tokio::test]
    async fn consecutive_failures_stop_the_loop() {
        let (mut tl, _) = driver(vec![
            Err(ProviderError::Network("reset".into())),
            Err(ProviderError::Timeout("slow".into())),
        ]);
        let mut session = Session::new("Plan").with_agents(["agent-a"]);
        let outcome = tl.run(&mut session).await.unwrap();
        assert!(matches!(outcome, LoopOutcome::Failed { turns: 2, .. }));
        assert_eq!(session.history.iter().filter(|m| m.content.starts_with("Turn failed")).count(), 2);
    }

    #[tokio::test]
    async fn failure_counter_resets_after_a_turn() {
        let a = pick("agent-a");
        let (tl, _) = driver(vec![
            Err(ProviderError::Network("reset".into())),
            Ok(a),
            Ok("Recovered.".into()),
        ]);
        let mut tl = tl.with_max_turns(2);
        let mut session = Session::new("Plan").with_agents(["agent-a"]);
        let outcome = tl.run(&mut session).await.unwrap();
        assert_eq!(outcome, LoopOutcome::Suspended { turns: 2 });
        assert_eq!(session.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn missing_credential_is_fatal() {
        let (mut tl, completion) = driver(vec![Err(ProviderError::NotConfigured("no key".into()))]);
        let mut session = Session::new("Plan").with_agents(["agent-a"]);
        let err = tl.run(&mut session).await.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn runtimes_are_reused_across_turns() {
        let (a, b) = (pick("agent-a"), pick("agent-b"));
        let (tl, completion) = driver(texts(&[&a, "First.", &b, "Second.", &a, "Third."]));
        let mut tl = tl.with_max_turns(3);
        let mut session = Session::new("Plan").with_agents(["agent-a", "agent-b"]);
        tl.run(&mut session).await.unwrap();

        // agent-a's third-turn request carries its own earlier exchange
        let last = completion.last_request().unwrap();
        assert_eq!(last.messages.len(), 3);
    }

    #[tokio::test]
    async fn delegated_exchange_survives_the_delegates_next_turn() {
        use boardroom_core::store::MemoryStore;

        let (a, b) = (pick("agent-a"), pick("agent-b"));
        let delegation = r#"TOOL: delegate {"agent": "agent-b", "instruction": "Report."}"#;
        let (tl, _, store) = driver_with_store(texts(&[&b, "Plan drafted.", &a, delegation, "Reported.", &b, "Wrapping up."]));
        let mut tl = tl.with_max_turns(3);
        let mut session = Session::new("Plan").with_agents(["agent-a", "agent-b"]);
        tl.run(&mut session).await.unwrap();

        let memory = store.get("agent-b", "p").await.unwrap();
        let contents: Vec<&str> = memory.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents.len(), 6);
        assert_eq!(contents[1], "Plan drafted.");
        assert_eq!(contents[2..4], ["Report.", "Reported."]);
        assert_eq!(contents[5], "Wrapping up.");
    }
}

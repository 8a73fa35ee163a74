//! The orchestrator: who speaks next.
//!
//! Two modes, chosen per call from the goal text:
//!
//! - **Workflow**: a catalog workflow's trigger appears in the goal. The
//!   decision is a pure function of which artifacts exist. No model call.
//! - **Heuristic**: the chairman runtime is prompted with the goal, the
//!   company state, the room and recent history, and answers in JSON.
//!
//! Heuristic answers are then bounded structurally: the completion policy
//! decides what TERMINATE means in autonomous sessions, and the anti-repeat
//! guard stops an agent that only talked from taking the floor again.

use crate::factory::AgentRuntimeFactory;
use crate::ledger::ActionLedger;
use crate::runtime::SendOptions;
use boardroom_config::{CompletionPolicy, OrchestratorConfig};
use boardroom_core::decision::OrchestrationDecision;
use boardroom_core::error::Result;
use boardroom_core::event::{DomainEvent, EventBus};
use boardroom_core::message::{format_transcript, ConversationMessage};
use boardroom_core::profile::{AgentProfile, AgentRegistry, MemoryKind};
use boardroom_core::store::ArtifactStore;
use boardroom_workflow::{Heartbeat, HeartbeatInput, WorkflowCatalog, WorkflowDefinition};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FALLBACK_REASON: &str = "Orchestrator failed to parse JSON.";
pub const FALLBACK_INSTRUCTION: &str = "Please continue the discussion.";
pub const STRATEGIC_REVIEW_INSTRUCTION: &str = "Conduct a Strategic Review based on the COMPANY STATE.";
pub const ACTION_DEMAND: &str =
    "You spoke last without acting. This turn you must take a concrete action: use a tool or delegate.";

const CHAIRMAN_PERSONA: &str = "You are the Chairman of the Board. You run the meeting, pick who \
speaks next, and keep everyone on the goal. You answer only in the JSON format requested.";

/// What the orchestrator sees when asked for a decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub goal: &'a str,
    pub history: &'a [ConversationMessage],
    /// Agents currently in the room, in seating order
    pub active_agents: &'a [String],
    pub company_state: &'a serde_json::Value,
    pub autonomous: bool,
    pub ledger: &'a ActionLedger,
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    factory: Arc<dyn AgentRuntimeFactory>,
    artifacts: Arc<dyn ArtifactStore>,
    principal_id: String,
    workflows: WorkflowCatalog,
    config: OrchestratorConfig,
    heartbeat: Option<Heartbeat>,
    events: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<AgentRegistry>,
        factory: Arc<dyn AgentRuntimeFactory>,
        artifacts: Arc<dyn ArtifactStore>,
        principal_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            factory,
            artifacts,
            principal_id: principal_id.into(),
            workflows: WorkflowCatalog::default(),
            config: OrchestratorConfig::default(),
            heartbeat: None,
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_workflows(mut self, workflows: WorkflowCatalog) -> Self {
        self.workflows = workflows;
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn select_workflow(&self, goal: &str) -> Option<&WorkflowDefinition> {
        self.workflows.select(goal)
    }

    pub async fn decide(&self, ctx: &DecisionContext<'_>) -> Result<OrchestrationDecision> {
        let (decision, workflow) = match self.workflows.select(ctx.goal) {
            Some(workflow) => {
                let paths = self.artifacts.list(&self.principal_id).await?;
                (workflow.decide(&paths), Some(workflow.id.clone()))
            }
            None => (self.decide_heuristic(ctx).await?, None),
        };

        info!(
            next_speaker = %decision.next_speaker_id,
            reason = %decision.reason,
            workflow = workflow.as_deref().unwrap_or("-"),
            "Decision made"
        );
        self.events.publish(DomainEvent::DecisionMade {
            next_speaker_id: decision.next_speaker_id.clone(),
            reason: decision.reason.clone(),
            workflow,
            timestamp: Utc::now(),
        });
        Ok(decision)
    }

    async fn decide_heuristic(&self, ctx: &DecisionContext<'_>) -> Result<OrchestrationDecision> {
        let profile = self.chairman_profile();
        // Fresh every time: the prompt already carries the whole context.
        let mut chairman = self.factory.create(&profile, &self.principal_id, 0);
        let output = chairman
            .send_message(&self.build_prompt(ctx), SendOptions::text_only())
            .await?;

        let decision = match parse_decision(&output.text) {
            Some(decision) => decision,
            None => {
                let preview: String = output.text.chars().take(200).collect();
                warn!(raw = %preview, "Chairman reply was not a decision, using fallback");
                self.events.publish(DomainEvent::DecisionFallback {
                    raw_preview: preview,
                    timestamp: Utc::now(),
                });
                self.fallback(ctx)
            }
        };

        let decision = self.apply_completion_policy(decision, ctx);
        Ok(self.enforce_progress(decision, ctx))
    }

    fn chairman_profile(&self) -> AgentProfile {
        self.registry
            .get(&self.config.chairman_agent)
            .cloned()
            .unwrap_or_else(|| {
                AgentProfile::new(&self.config.chairman_agent, "Board Chairman", CHAIRMAN_PERSONA)
                    .with_layer("board")
                    .with_memory(MemoryKind::Short, 1)
            })
    }

    /// Active agents, or the whole roster minus the chairman if the room is empty.
    fn present_agents(&self, ctx: &DecisionContext<'_>) -> Vec<String> {
        if !ctx.active_agents.is_empty() {
            return ctx.active_agents.to_vec();
        }
        self.registry
            .ids()
            .into_iter()
            .filter(|id| *id != self.config.chairman_agent)
            .map(String::from)
            .collect()
    }

    fn build_prompt(&self, ctx: &DecisionContext<'_>) -> String {
        let present = self.present_agents(ctx);
        let describe = |id: &str| match self.registry.get(id) {
            Some(p) => format!("- {} (ID: {})", p.role, p.id),
            None => format!("- {id}"),
        };
        let room: Vec<String> = present.iter().map(|id| describe(id.as_str())).collect();
        let outside: Vec<String> = self
            .registry
            .ids()
            .into_iter()
            .filter(|id| *id != self.config.chairman_agent && !present.iter().any(|p| p.as_str() == *id))
            .map(describe)
            .collect();

        let window = self.config.history_window;
        let recent = &ctx.history[ctx.history.len().saturating_sub(window)..];
        let state = serde_json::to_string_pretty(ctx.company_state).unwrap_or_else(|_| "{}".into());
        let mode = if ctx.autonomous { "ON" } else { "OFF" };
        let review = &self.config.review_agent;

        format!(
            r#"CURRENT GOAL: "{goal}"
AUTONOMOUS MODE: {mode}

COMPANY STATE:
{state}

AGENTS IN THE ROOM:
{room}

AGENTS AVAILABLE TO ADD:
{outside}

CONVERSATION HISTORY:
{history}

DECISION RULES:
- Never select the agent who spoke last unless nobody else has a concrete action left.
- Never select an agent just to acknowledge, thank or confirm. After an acknowledgment the next turn must do real work.
- Stay within the agents in the room. Use "manageTeam" only when the goal cannot be reached without adding or removing someone, and always give a reason.
- If the goal is fully achieved and AUTONOMOUS MODE is ON, select "{review}" and instruct them to "{STRATEGIC_REVIEW_INSTRUCTION}"
- If the goal is fully achieved and AUTONOMOUS MODE is OFF, output "TERMINATE".

Answer with JSON only:
{{
  "nextSpeakerId": "agent-id" | "TERMINATE",
  "reason": "why this agent",
  "instruction": "what they must do now",
  "manageTeam": {{ "action": "ADD" | "REMOVE" | null, "agentId": "agent-id", "reason": "why" }}
}}"#,
            goal = ctx.goal,
            room = room.join("\n"),
            outside = if outside.is_empty() { "(none)".to_string() } else { outside.join("\n") },
            history = format_transcript(recent),
        )
    }

    fn fallback(&self, ctx: &DecisionContext<'_>) -> OrchestrationDecision {
        match self.present_agents(ctx).into_iter().next() {
            Some(first) => OrchestrationDecision::speak(first, FALLBACK_REASON, FALLBACK_INSTRUCTION),
            None => OrchestrationDecision::terminate("No agents are available to continue."),
        }
    }

    fn apply_completion_policy(
        &self,
        decision: OrchestrationDecision,
        ctx: &DecisionContext<'_>,
    ) -> OrchestrationDecision {
        if !decision.is_terminate()
            || !ctx.autonomous
            || self.config.completion_policy != CompletionPolicy::StrategicReview
        {
            return decision;
        }
        debug!(review_agent = %self.config.review_agent, "Autonomous session: TERMINATE becomes strategic review");
        OrchestrationDecision::speak(
            &self.config.review_agent,
            format!("Goal reached; autonomous session continues. {}", decision.reason)
                .trim_end()
                .to_string(),
            STRATEGIC_REVIEW_INSTRUCTION,
        )
    }

    /// Anti-repeat guard.
    fn enforce_progress(&self, mut decision: OrchestrationDecision, ctx: &DecisionContext<'_>) -> OrchestrationDecision {
        if decision.is_terminate() {
            return decision;
        }
        let Some(previous) = previous_agent_speaker(ctx.history) else {
            return decision;
        };
        if decision.next_speaker_id != previous || ctx.ledger.acted(previous) {
            return decision;
        }

        let alternative = ctx
            .active_agents
            .iter()
            .find(|id| id.as_str() != previous && **id != self.config.chairman_agent);
        match alternative {
            Some(other) => {
                info!(from = previous, to = %other, "Re-routing repeated speaker");
                decision.reason = format!("{} (re-routed: {previous} spoke last without acting)", decision.reason);
                decision.next_speaker_id = other.clone();
            }
            None => {
                info!(agent_id = previous, "Repeated speaker kept; concrete action required");
            }
        }
        decision.requires_action = true;
        decision.instruction = format!("{ACTION_DEMAND} {}", decision.instruction).trim_end().to_string();
        decision
    }

    /// Heartbeat check; `None` when no heartbeat is configured or nothing is due.
    pub async fn tick(&self, input: &HeartbeatInput, now: DateTime<Utc>) -> Option<OrchestrationDecision> {
        let heartbeat = self.heartbeat.as_ref()?;
        let decision = heartbeat.tick(input, now).await?;
        self.events.publish(DomainEvent::DecisionMade {
            next_speaker_id: decision.next_speaker_id.clone(),
            reason: decision.reason.clone(),
            workflow: None,
            timestamp: Utc::now(),
        });
        Some(decision)
    }
}

/// Parse chairman output: code fences removed, then the span from the first
/// `{` to the last `}`.
pub fn parse_decision(raw: &str) -> Option<OrchestrationDecision> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    let decision: OrchestrationDecision = serde_json::from_str(&cleaned[start..=end]).ok()?;
    if decision.next_speaker_id.trim().is_empty() {
        return None;
    }
    Some(decision)
}

/// The agent behind the latest non-system message, if an agent wrote it.
pub fn previous_agent_speaker(history: &[ConversationMessage]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| !m.is_system())
        .filter(|m| m.is_agent())
        .map(|m| m.speaker_id.as_str())
}

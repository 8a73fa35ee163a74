//! End-to-end integration tests for Boardroom sessions.
//!
//! These tests wire the real stores, tool router, runtimes, orchestrator and
//! turn loop together, with only the completion service scripted.

use std::sync::{Arc, Mutex};

use boardroom_agent::orchestrator::ACTION_DEMAND;
use boardroom_agent::{
    DefaultRuntimeFactory, LastAction, LoopOutcome, Orchestrator, RuntimeSettings, Session, TurnLoop,
};
use boardroom_config::{AppConfig, OrchestratorConfig, ToolsConfig};
use boardroom_core::error::{Error, ProviderError};
use boardroom_core::event::{DomainEvent, EventBus};
use boardroom_core::profile::{AgentProfile, AgentRegistry};
use boardroom_core::provider::{CompletionRequest, CompletionService};
use boardroom_core::store::{NewTask, TaskPriority};
use boardroom_memory::{InMemoryStore, Stores};
use boardroom_tools::{ApprovalGate, default_router};
use boardroom_workflow::{
    Heartbeat, HeartbeatInput, WORKFLOW_COMPLETE, WorkflowCatalog, WorkflowDefinition, WorkflowStep,
};
use tokio::sync::broadcast;

// ── Mock completion service ─────────────────────────────────────────────

/// Returns scripted replies in sequence and keeps every request.
struct ScriptedCompletion {
    responses: Mutex<Vec<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    fn new(responses: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, index: usize) -> CompletionRequest {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedCompletion {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let index = requests.len();
        if index >= responses.len() {
            panic!(
                "ScriptedCompletion exhausted: call #{}, have {}",
                index,
                responses.len()
            );
        }
        requests.push(request);
        responses[index].clone()
    }
}

fn pick(agent: &str, instruction: &str) -> String {
    format!(r#"{{"nextSpeakerId": "{agent}", "reason": "Their turn.", "instruction": "{instruction}"}}"#)
}

const TERMINATE_JSON: &str = r#"{"nextSpeakerId": "TERMINATE", "reason": "The goal is met."}"#;

// ── Harness ─────────────────────────────────────────────────────────────

struct Board {
    stores: Stores,
    completion: Arc<ScriptedCompletion>,
    events: Arc<EventBus>,
    driver: TurnLoop,
}

fn board(
    agents: Vec<AgentProfile>,
    workflows: WorkflowCatalog,
    config: OrchestratorConfig,
    completion: ScriptedCompletion,
) -> Board {
    let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
    let completion = Arc::new(completion);
    let events = Arc::new(EventBus::new(256));
    let registry = Arc::new(AgentRegistry::new(agents));
    let tools = default_router(&stores, &ToolsConfig::default(), registry.clone(), Arc::new(ApprovalGate::new()));

    let factory = DefaultRuntimeFactory::new(
        completion.clone(),
        stores.memory.clone(),
        tools,
        registry.clone(),
        RuntimeSettings::default(),
        events.clone(),
    );
    let orchestrator = Orchestrator::new(registry, factory.clone(), stores.artifacts.clone(), "acme")
        .with_workflows(workflows)
        .with_config(config)
        .with_events(events.clone());
    let driver = TurnLoop::new(orchestrator, factory, "acme").with_events(events.clone());

    Board {
        stores,
        completion,
        events,
        driver,
    }
}

fn executive_roster() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new("board-chairman", "Chairman", "You run the meeting."),
        AgentProfile::new("ceo-agent", "CEO", "You lead.").with_tools(["delegate", "create_task"]),
        AgentProfile::new("cto-agent", "CTO", "You build.").with_tools(["write_file", "read_file"]),
        AgentProfile::new("qa-agent", "QA Lead", "You test."),
    ]
}

fn drain(rx: &mut broadcast::Receiver<Arc<DomainEvent>>) -> Vec<Arc<DomainEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ── E2E: artifact-gated workflow ────────────────────────────────────────

#[tokio::test]
async fn e2e_workflow_writer_then_editor() {
    let workflow = WorkflowDefinition::new(
        "article_review",
        vec![
            WorkflowStep::new("draft", "writer", "Write the first draft.", "drafts/article.md"),
            WorkflowStep::new("review", "editor", "Review the draft.", "reviews/article.md"),
        ],
    )
    .with_triggers(&["article"]);

    let mut b = board(
        vec![
            AgentProfile::new("writer", "Writer", "You write.").with_tools(["write_file"]),
            AgentProfile::new("editor", "Editor", "You edit.").with_tools(["write_file", "read_file"]),
        ],
        WorkflowCatalog::new(vec![workflow]),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            "Drafting now.\nTOOL: write_file {\"path\": \"drafts/article.md\", \"content\": \"# Launch\"}",
            "```json\n{\"tool\": \"write_file\", \"parameters\": {\"path\": \"reviews/article.md\", \"content\": \"Approved.\"}}\n```",
        ]),
    );
    let mut rx = b.events.subscribe();
    let mut session = Session::new("Write the launch article").with_agents(["writer", "editor"]);

    let outcome = b.driver.run(&mut session).await.unwrap();

    assert_eq!(
        outcome,
        LoopOutcome::Terminated {
            reason: WORKFLOW_COMPLETE.into(),
            turns: 2
        }
    );
    // Workflow mode never asks the model who speaks next
    assert_eq!(b.completion.calls(), 2);
    assert!(b.completion.request(0).messages[0].content.contains("Write the first draft."));

    let decisions: Vec<(String, String)> = drain(&mut rx)
        .iter()
        .filter_map(|e| match e.as_ref() {
            DomainEvent::DecisionMade {
                next_speaker_id,
                reason,
                workflow,
                ..
            } => {
                assert_eq!(workflow.as_deref(), Some("article_review"));
                Some((next_speaker_id.clone(), reason.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0].0, "writer");
    assert!(decisions[0].1.ends_with("Waiting for artifact drafts/article.md"));
    assert_eq!(decisions[1].0, "editor");
    assert!(decisions[1].1.ends_with("Waiting for artifact reviews/article.md"));
    assert_eq!(decisions[2].0, "TERMINATE");

    let paths = b.stores.artifacts.list("acme").await.unwrap();
    assert!(paths.contains(&"drafts/article.md".to_string()));
    assert!(paths.contains(&"reviews/article.md".to_string()));
    assert_eq!(
        b.stores.artifacts.load("drafts/article.md", "acme").await.unwrap().as_deref(),
        Some("# Launch")
    );
}

// ── E2E: heuristic mode ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_terminate_issues_no_further_calls() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[TERMINATE_JSON]),
    );
    let mut session = Session::new("Say hello").with_agents(["ceo-agent", "cto-agent"]);

    let outcome = b.driver.run(&mut session).await.unwrap();
    assert!(matches!(outcome, LoopOutcome::Terminated { turns: 0, .. }));
    assert_eq!(b.completion.calls(), 1);
    assert_eq!(session.history.len(), 1);
}

#[tokio::test]
async fn e2e_delegation_is_attributed_to_the_delegate() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            &pick("ceo-agent", "Get the release verified."),
            r#"QA should check this. TOOL: delegate {"agent": "qa-agent", "instruction": "Run the smoke tests."}"#,
            "Smoke tests pass.",
            TERMINATE_JSON,
        ]),
    );
    let mut rx = b.events.subscribe();
    let mut session = Session::new("Ship the release").with_agents(["ceo-agent", "cto-agent"]);

    b.driver.run(&mut session).await.unwrap();

    // The shared history shows the delegator's turn and the attributed result,
    // never a message under the delegate's name
    assert!(session.history.iter().all(|m| m.speaker_id != "qa-agent"));
    assert!(session.history.iter().any(|m| m.speaker_id == "ceo-agent"));
    assert!(session.history.iter().any(|m| m.is_system()
        && m.content == "Tool Result (delegate): [Delegated to QA Lead (qa-agent)]: Smoke tests pass."));
    assert_eq!(
        session.ledger.get("ceo-agent"),
        Some(&LastAction::Delegated {
            target: "qa-agent".into()
        })
    );

    // The delegate kept its own memory of the exchange
    let qa_memory = b.stores.memory.get("qa-agent", "acme").await.unwrap();
    assert_eq!(qa_memory.len(), 2);
    assert_eq!(qa_memory[0].content, "Run the smoke tests.");

    let delegated = drain(&mut rx).into_iter().any(|e| {
        matches!(e.as_ref(), DomainEvent::DelegationCompleted { from_agent, to_agent, .. }
            if from_agent == "ceo-agent" && to_agent == "qa-agent")
    });
    assert!(delegated);
}

#[tokio::test]
async fn e2e_delegated_turn_stays_in_the_delegates_memory() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            &pick("qa-agent", "Plan tests."),
            "Test plan drafted.",
            &pick("ceo-agent", "Get the release verified."),
            r#"TOOL: delegate {"agent": "qa-agent", "instruction": "Run the smoke tests."}"#,
            "Smoke tests pass.",
            &pick("qa-agent", "Report."),
            "Reporting.",
            TERMINATE_JSON,
        ]),
    );
    let mut session = Session::new("Ship the release").with_agents(["ceo-agent", "qa-agent"]);

    b.driver.run(&mut session).await.unwrap();
    assert_eq!(b.completion.calls(), 8);

    let qa_memory = b.stores.memory.get("qa-agent", "acme").await.unwrap();
    let contents: Vec<&str> = qa_memory.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 6);
    assert_eq!(contents[1], "Test plan drafted.");
    assert_eq!(contents[2..4], ["Run the smoke tests.", "Smoke tests pass."]);
    assert_eq!(contents[5], "Reporting.");

    // The later turn's prompt already included the delegated exchange
    let last_qa_request = b.completion.request(6);
    assert!(last_qa_request.messages.iter().any(|m| m.content == "Smoke tests pass."));
}

#[tokio::test]
async fn e2e_talker_is_rerouted_to_someone_who_acts() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            &pick("ceo-agent", "Kick off."),
            "I think we should plan carefully.",
            &pick("ceo-agent", "Keep going."),
            r#"TOOL: write_file {"path": "plan.md", "content": "1. Build"}"#,
            TERMINATE_JSON,
        ]),
    );
    let mut session = Session::new("Plan the quarter").with_agents(["ceo-agent", "cto-agent"]);

    b.driver.run(&mut session).await.unwrap();

    let speakers: Vec<&str> = session
        .history
        .iter()
        .filter(|m| m.is_agent())
        .map(|m| m.speaker_id.as_str())
        .collect();
    assert_eq!(speakers, vec!["ceo-agent", "cto-agent"]);

    let cto_request = b.completion.request(3);
    let prompt = &cto_request.messages.last().unwrap().content;
    assert!(prompt.contains(ACTION_DEMAND));
    let paths = b.stores.artifacts.list("acme").await.unwrap();
    assert_eq!(paths, vec!["plan.md".to_string()]);
}

#[tokio::test]
async fn e2e_turn_cap_suspends_then_resumes() {
    let config = OrchestratorConfig {
        max_turns: 2,
        ..OrchestratorConfig::default()
    };
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        config,
        ScriptedCompletion::texts(&[
            &pick("ceo-agent", "Open."),
            "Opening remarks.",
            &pick("cto-agent", "Report."),
            "Status is green.",
            TERMINATE_JSON,
        ]),
    );
    let mut rx = b.events.subscribe();
    let mut session = Session::new("Weekly sync").with_agents(["ceo-agent", "cto-agent"]);

    let outcome = b.driver.run(&mut session).await.unwrap();
    assert_eq!(outcome, LoopOutcome::Suspended { turns: 2 });
    assert_eq!(b.completion.calls(), 4);
    assert!(
        drain(&mut rx)
            .iter()
            .any(|e| matches!(e.as_ref(), DomainEvent::LoopSuspended { turns: 2, .. }))
    );

    let outcome = b.driver.resume(&mut session).await.unwrap();
    assert!(matches!(outcome, LoopOutcome::Terminated { .. }));
    assert_eq!(b.completion.calls(), 5);
}

#[tokio::test]
async fn e2e_unknown_speaker_does_not_end_the_session() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            &pick("cmo-agent", "Market it."),
            &pick("cto-agent", "Build it."),
            r#"TOOL: write_file {"path": "build.md", "content": "done"}"#,
            TERMINATE_JSON,
        ]),
    );
    let mut session = Session::new("Launch").with_agents(["ceo-agent", "cto-agent"]);

    let outcome = b.driver.run(&mut session).await.unwrap();
    assert!(matches!(outcome, LoopOutcome::Terminated { turns: 2, .. }));
    assert!(
        session
            .history
            .iter()
            .any(|m| m.is_system() && m.content.contains("'cmo-agent' is not available"))
    );
}

#[tokio::test]
async fn e2e_disallowed_tool_is_refused() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::texts(&[
            &pick("ceo-agent", "Record the decision."),
            r#"TOOL: write_file {"path": "decision.md", "content": "yes"}"#,
            TERMINATE_JSON,
        ]),
    );
    let mut session = Session::new("Decide").with_agents(["ceo-agent", "qa-agent"]);

    b.driver.run(&mut session).await.unwrap();

    assert!(session.history.iter().any(|m| m.is_system()
        && m.content.contains("Agent 'ceo-agent' is not allowed to use tool 'write_file'.")));
    assert!(b.stores.artifacts.list("acme").await.unwrap().is_empty());
    assert_eq!(session.ledger.get("ceo-agent"), Some(&LastAction::Conversational));
}

// ── E2E: failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_credential_is_a_config_error() {
    let err = boardroom_providers::from_config(&AppConfig::default()).err().unwrap();
    assert!(matches!(err, Error::Config { .. }));
    assert!(err.is_fatal());

    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::new(vec![Err(ProviderError::NotConfigured("no API key".into()))]),
    );
    let mut session = Session::new("Anything").with_agents(["ceo-agent"]);
    let err = b.driver.run(&mut session).await.unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    // Fatal errors are never retried
    assert_eq!(b.completion.calls(), 1);
}

#[tokio::test]
async fn e2e_transient_failures_are_bounded() {
    let mut b = board(
        executive_roster(),
        WorkflowCatalog::default(),
        OrchestratorConfig::default(),
        ScriptedCompletion::new(vec![
            Err(ProviderError::RateLimited { retry_after_secs: 1 }),
            Err(ProviderError::Network("connection reset".into())),
        ]),
    );
    let mut session = Session::new("Anything").with_agents(["ceo-agent"]);
    let outcome = b.driver.run(&mut session).await.unwrap();
    assert!(matches!(outcome, LoopOutcome::Failed { turns: 2, .. }));
}

// ── E2E: heartbeat ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_heartbeat_routes_unassigned_work() {
    let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
    stores
        .tasks
        .create(NewTask::new("Fix checkout bug").with_priority(TaskPriority::High))
        .await
        .unwrap();

    let config = AppConfig::default();
    let heartbeat = Heartbeat::new(config.heartbeat.clone(), stores.tasks.clone());
    let decision = heartbeat
        .tick(&HeartbeatInput::idle(), chrono::Utc::now())
        .await
        .unwrap();

    assert_eq!(decision.next_speaker_id, config.heartbeat.assignment_agent);
    assert_eq!(decision.reason, "There are unassigned tasks.");
    assert!(decision.instruction.contains("Fix checkout bug"));
}

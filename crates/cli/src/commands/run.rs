//! `boardroom run`: drive a session toward a goal.

use super::{load_config, load_registry, open_stores};
use boardroom_agent::{
    DefaultRuntimeFactory, LoopOutcome, Orchestrator, RuntimeSettings, Session, StepOutcome, TurnLoop,
};
use boardroom_config::AppConfig;
use boardroom_core::event::EventBus;
use boardroom_tools::ApprovalGate;
use boardroom_workflow::WorkflowCatalog;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub struct RunArgs {
    pub goal: String,
    pub agents: Vec<String>,
    pub autonomous: bool,
    pub max_turns: Option<u32>,
    pub company_state: Option<PathBuf>,
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config()?;
    if let Some(max_turns) = args.max_turns {
        config.orchestrator.max_turns = max_turns.max(1);
    }

    if !config.has_api_key() {
        print_missing_key_help();
        return Err("No API key found. See above for setup instructions.".into());
    }
    let completion = boardroom_providers::from_config(&config)?;

    let stores = open_stores(&config).await?;
    let registry = load_registry(&config, &stores).await;
    let events = Arc::new(EventBus::default());
    let gate = Arc::new(ApprovalGate::new());
    let tools = boardroom_tools::default_router(&stores, &config.tools, registry.clone(), gate.clone());

    let factory = DefaultRuntimeFactory::new(
        completion,
        stores.memory.clone(),
        tools,
        registry.clone(),
        RuntimeSettings::from_config(&config),
        events.clone(),
    );
    let orchestrator = Orchestrator::new(
        registry.clone(),
        factory.clone(),
        stores.artifacts.clone(),
        &config.principal_id,
    )
    .with_workflows(WorkflowCatalog::from_config(&config.workflows))
    .with_config(config.orchestrator.clone())
    .with_events(events.clone());

    let agents = if args.agents.is_empty() {
        registry
            .ids()
            .into_iter()
            .filter(|id| *id != config.orchestrator.chairman_agent)
            .map(String::from)
            .collect()
    } else {
        if let Some(unknown) = args.agents.iter().find(|id| !registry.contains(id)) {
            return Err(format!("Unknown agent '{unknown}'. Run `boardroom agents` to list the roster.").into());
        }
        args.agents
    };

    let company_state = match &args.company_state {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&raw).map_err(|e| format!("Invalid company state in {}: {e}", path.display()))?
        }
        None => serde_json::json!({ "status": "ACTIVE" }),
    };

    let mut session = Session::new(&args.goal)
        .with_agents(agents)
        .with_company_state(company_state)
        .with_autonomous(args.autonomous);
    let mut driver = TurnLoop::new(orchestrator, factory, &config.principal_id).with_events(events);

    print_header(&config, &session, driver.orchestrator().select_workflow(&args.goal).map(|w| w.name.as_str()));

    let mut outcome = driver.run_with(&mut session, print_step).await?;
    while let LoopOutcome::Suspended { turns } = outcome
        && confirm(&format!("\n⏸️  Turn cap reached after {turns} turns. Continue?"))?
    {
        session.reset_allowance();
        outcome = driver.run_with(&mut session, print_step).await?;
    }

    let session_id = format!("run-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S"));
    for message in &session.history {
        stores.history.append_history(&session_id, message).await?;
    }
    info!(session_id = %session_id, messages = session.history.len(), "Session history saved");

    resolve_approvals(&gate).await?;

    match outcome {
        LoopOutcome::Terminated { reason, turns } => {
            println!("\n✅ Session finished after {turns} turns: {reason}");
        }
        LoopOutcome::Suspended { turns } => {
            println!("\n⏸️  Stopped at the turn cap after {turns} turns.");
        }
        LoopOutcome::Failed { error, turns } => {
            return Err(format!("Session failed after {turns} turns: {error}").into());
        }
    }
    println!("   History saved as {session_id}\n");

    Ok(())
}

fn print_header(config: &AppConfig, session: &Session, workflow: Option<&str>) {
    println!("🏛️  Boardroom");
    println!("============");
    println!("  Goal:       {}", session.goal);
    println!("  Model:      {}", config.default_model);
    println!("  Room:       {}", session.active_agents.join(", "));
    println!("  Turn cap:   {}", config.orchestrator.max_turns);
    if let Some(name) = workflow {
        println!("  Workflow:   {name}");
    }
    if session.autonomous {
        println!("  Autonomous: {:?}", config.orchestrator.completion_policy);
    }
}

fn print_step(outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Spoke { agent_id, output } => {
            println!("\n🗣️  {agent_id}:\n{}", output.text.trim());
            if let (Some(call), Some(result)) = (&output.tool_call, &output.tool_result) {
                println!("   🔧 {}: {}", call.name, preview(result, 200));
            }
        }
        StepOutcome::Recovered { note } => println!("\n⚠️  {note}"),
        StepOutcome::Terminated { reason } => println!("\n🏁 {reason}"),
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out.replace('\n', " ")
}

/// Ask about each tool call that paused on the approval gate.
async fn resolve_approvals(gate: &ApprovalGate) -> Result<(), Box<dyn std::error::Error>> {
    let pending = gate.pending().await;
    if pending.is_empty() {
        return Ok(());
    }

    println!("\n⏳ {} tool call(s) await approval:", pending.len());
    for approval in pending {
        let question = format!(
            "   {} wants to run {} {}. Approve?",
            approval.context.agent_id,
            approval.call.name,
            preview(&serde_json::Value::Object(approval.call.payload.clone()).to_string(), 120)
        );
        if confirm(&question)? {
            match gate.approve(&approval.id).await {
                Ok(result) => println!("   ✅ {result}"),
                Err(e) => println!("   ❌ {e}"),
            }
        } else {
            gate.reject(&approval.id).await;
            println!("   🚫 Rejected");
        }
    }
    Ok(())
}

/// Ask a yes/no question on stdin; anything but `y` is no.
fn confirm(question: &str) -> std::io::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_missing_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    BOARDROOM_API_KEY    (highest priority)");
    eprintln!("    OPENROUTER_API_KEY");
    eprintln!("    OPENAI_API_KEY");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
}

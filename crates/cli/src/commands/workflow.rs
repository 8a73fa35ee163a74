//! `boardroom workflow`: list workflows and show artifact progress.

use super::{load_config, open_stores};
use boardroom_workflow::WorkflowCatalog;

pub async fn run(goal: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let catalog = WorkflowCatalog::from_config(&config.workflows);

    let Some(goal) = goal else {
        if catalog.is_empty() {
            println!("📋 No workflows configured.");
            return Ok(());
        }
        println!("📋 Workflows ({}):", catalog.workflows().len());
        println!("{:-<72}", "");
        for workflow in catalog.workflows() {
            println!("  {:<28} {}", workflow.id, workflow.name);
            println!("      └─ triggers: {}", workflow.triggers.join(", "));
            for (i, step) in workflow.steps.iter().enumerate() {
                println!("      {:>2}. {:<24} → {}", i + 1, step.agent_id, step.expected_artifact);
            }
        }
        return Ok(());
    };

    let Some(workflow) = catalog.select(&goal) else {
        println!("🧭 No workflow matches; the chairman would decide heuristically.");
        return Ok(());
    };

    let stores = open_stores(&config).await?;
    let paths = stores.artifacts.list(&config.principal_id).await?;
    let progress = workflow.progress(&paths);

    println!("🧭 {} ({})", workflow.name, workflow.id);
    println!("   Progress: {}/{} steps", progress.completed, progress.total);
    for step in &workflow.steps {
        let mark = if step.is_satisfied(&paths) { "✅" } else { "⬜" };
        println!("   {mark} {:<24} {:<22} {}", step.id, step.agent_id, step.expected_artifact);
    }

    let decision = workflow.decide(&paths);
    println!("\n   Next: {} ({})", decision.next_speaker_id, decision.reason);

    Ok(())
}

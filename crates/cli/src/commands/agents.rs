//! `boardroom agents`: show the roster.

use super::{load_config, load_registry, open_stores};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let stores = open_stores(&config).await?;
    let registry = load_registry(&config, &stores).await;

    println!("👥 Agents ({}):", registry.len());
    println!("{:-<72}", "");
    for profile in registry.profiles() {
        let marker = if profile.id == config.orchestrator.chairman_agent {
            "🪑"
        } else {
            "  "
        };
        println!("  {marker} {:<28} {:<24} {}", profile.id, profile.role, profile.layer);
        if let Some(manager) = &profile.reports_to {
            println!("      └─ reports to: {manager}");
        }
        if !profile.allowed_tools.is_empty() {
            println!("      └─ tools: {}", profile.allowed_tools.join(", "));
        }
        if let Some(model) = &profile.model_id {
            println!("      └─ model: {model}");
        }
    }

    Ok(())
}

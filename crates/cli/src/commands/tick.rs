//! `boardroom tick`: heartbeat checks.

use super::{load_config, open_stores};
use async_trait::async_trait;
use boardroom_core::decision::OrchestrationDecision;
use boardroom_workflow::{Heartbeat, HeartbeatInput, HeartbeatProbe, HeartbeatScheduler};
use chrono::Utc;
use std::sync::Arc;

/// Reports the same input on every tick; silence keeps growing from the
/// fixed last-message time.
struct FixedProbe(HeartbeatInput);

#[async_trait]
impl HeartbeatProbe for FixedProbe {
    async fn probe(&self) -> HeartbeatInput {
        self.0.clone()
    }
}

pub async fn run(
    meeting: Option<String>,
    silent_secs: u64,
    idle: bool,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let stores = open_stores(&config).await?;
    let heartbeat = Arc::new(Heartbeat::new(config.heartbeat.clone(), stores.tasks.clone()));

    let input = match meeting {
        Some(id) => {
            let silent = chrono::Duration::seconds(i64::try_from(silent_secs).unwrap_or(i64::MAX));
            HeartbeatInput::in_meeting(id, Utc::now() - silent)
        }
        None if idle => HeartbeatInput::idle(),
        None => HeartbeatInput {
            company_state: serde_json::json!({ "status": "ACTIVE" }),
            ..HeartbeatInput::default()
        },
    };

    if !watch {
        match heartbeat.tick(&input, Utc::now()).await {
            Some(decision) => print_decision(&decision),
            None => println!("💤 Nothing due."),
        }
        return Ok(());
    }

    if !config.heartbeat.enabled {
        println!("⚠️  heartbeat.enabled is false in config; watching anyway.");
    }
    println!(
        "💓 Heartbeat every {}s (silence threshold {}s). Ctrl+C to stop.",
        config.heartbeat.interval_secs.max(1),
        config.heartbeat.silence_threshold_secs
    );

    let scheduler = HeartbeatScheduler::new(heartbeat);
    let (mut decisions, handle) = scheduler.start(Arc::new(FixedProbe(input)));
    loop {
        tokio::select! {
            decision = decisions.recv() => match decision {
                Some(decision) => print_decision(&decision),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n👋 Stopping heartbeat.");
                break;
            }
        }
    }
    drop(decisions);
    handle.abort();

    Ok(())
}

fn print_decision(decision: &OrchestrationDecision) {
    println!("📣 {} → {}", Utc::now().format("%H:%M:%S"), decision.next_speaker_id);
    println!("   Reason:      {}", decision.reason);
    println!("   Instruction: {}", decision.instruction);
}

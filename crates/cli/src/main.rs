//! Boardroom CLI, the main entry point.
//!
//! Commands:
//! - `onboard`   Initialize config and storage
//! - `run`       Drive a session toward a goal
//! - `tick`      Ask the heartbeat whether anything is due
//! - `agents`    Show the roster
//! - `workflow`  Show workflows and their artifact progress
//! - `extract`   Show the tool call the extractor finds in some text

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "boardroom",
    about = "Boardroom: a chairman-led meeting of AI agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and storage
    Onboard,

    /// Run a session toward a goal
    Run {
        /// What the session should achieve
        #[arg(short, long)]
        goal: String,

        /// Agents in the room (comma separated); defaults to the roster
        #[arg(short, long, value_delimiter = ',')]
        agents: Vec<String>,

        /// Treat the chairman's TERMINATE per the configured completion policy
        #[arg(long)]
        autonomous: bool,

        /// Override orchestrator.max_turns
        #[arg(long)]
        max_turns: Option<u32>,

        /// JSON file with the company state shown to the chairman
        #[arg(long)]
        company_state: Option<PathBuf>,
    },

    /// Run one heartbeat check
    Tick {
        /// An active meeting id
        #[arg(long)]
        meeting: Option<String>,

        /// Seconds since the last message in the meeting
        #[arg(long, default_value_t = 0)]
        silent_secs: u64,

        /// Report the company as idle (enables the standup routine)
        #[arg(long)]
        idle: bool,

        /// Keep checking on the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Show the agent roster
    Agents,

    /// Show workflows, or the one a goal selects
    Workflow {
        /// Goal text to match against workflow triggers
        #[arg(short, long)]
        goal: Option<String>,
    },

    /// Show the tool call found in text (reads stdin when no text is given)
    Extract { text: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).init();
    }

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Run {
            goal,
            agents,
            autonomous,
            max_turns,
            company_state,
        } => {
            commands::run::run(commands::run::RunArgs {
                goal,
                agents,
                autonomous,
                max_turns,
                company_state,
            })
            .await?
        }
        Commands::Tick {
            meeting,
            silent_secs,
            idle,
            watch,
        } => commands::tick::run(meeting, silent_secs, idle, watch).await?,
        Commands::Agents => commands::agents::run().await?,
        Commands::Workflow { goal } => commands::workflow::run(goal).await?,
        Commands::Extract { text } => commands::extract::run(text)?,
    }

    Ok(())
}

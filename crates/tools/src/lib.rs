//! Built-in tool implementations for Boardroom.
//!
//! Tools give agents the ability to act on shared state: write and read
//! workspace files, open, move and escalate tasks, and patch another
//! agent's persona.
//! Sensitive tools can be routed through an [`ApprovalGate`].

pub mod agent_config;
pub mod approval;
pub mod file_read;
pub mod file_write;
pub mod task;

pub use approval::{ApprovalGate, GatedTool, PendingApproval};

use boardroom_config::ToolsConfig;
use boardroom_core::profile::AgentRegistry;
use boardroom_core::tool::{Tool, ToolRouter};
use boardroom_memory::Stores;
use std::sync::Arc;

/// Build the router with every built-in tool. `registry` supplies the
/// reporting lines `escalate_issue` follows.
///
/// When `config.require_approval` is set, tools named in `config.sensitive`
/// are wrapped so they pause on `gate` instead of running.
pub fn default_router(
    stores: &Stores,
    config: &ToolsConfig,
    registry: Arc<AgentRegistry>,
    gate: Arc<ApprovalGate>,
) -> ToolRouter {
    let write: Arc<dyn Tool> = Arc::new(file_write::FileWriteTool::new(stores.artifacts.clone()));
    let read: Arc<dyn Tool> = Arc::new(file_read::FileReadTool::new(stores.artifacts.clone()));
    let list: Arc<dyn Tool> = Arc::new(file_read::ListFilesTool::new(stores.artifacts.clone()));
    let ticket: Arc<dyn Tool> = Arc::new(task::CreateTaskTool::new(stores.tasks.clone()));
    let status: Arc<dyn Tool> = Arc::new(task::UpdateTaskStatusTool::new(stores.tasks.clone()));
    let escalate: Arc<dyn Tool> = Arc::new(task::EscalateIssueTool::new(stores.tasks.clone(), registry));

    let mut entries: Vec<(&str, Arc<dyn Tool>)> = vec![
        ("write_file", write.clone()),
        ("notepad", write),
        ("read_file", read),
        ("list_files", list),
        ("dev_ticket", ticket.clone()),
        ("create_task", ticket),
        ("update_task_status", status),
        ("escalate_issue", escalate),
    ];
    if config.allow_config_updates {
        entries.push((
            "update_agent_config",
            Arc::new(agent_config::UpdateAgentConfigTool::new(stores.configs.clone())) as Arc<dyn Tool>,
        ));
    }

    let mut router = ToolRouter::new();
    for (name, tool) in entries {
        let tool = if config.require_approval && config.sensitive.iter().any(|s| s == name) {
            Arc::new(GatedTool::new(tool, gate.clone())) as Arc<dyn Tool>
        } else {
            tool
        };
        router.register_alias(name, tool);
    }
    router
}

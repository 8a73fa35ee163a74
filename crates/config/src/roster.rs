//! Built-in agent roster and workflow definitions.
//!
//! Used whenever `config.toml` does not declare its own `[[agents]]` or
//! `[[workflows]]`.

use boardroom_core::{AgentProfile, MemoryKind};

use crate::{WorkflowConfig, WorkflowStepConfig};

const TOOL_FORMAT: &str = "To act, reply with exactly one line of the form \
TOOL: <name> {json payload}. Available tools: write_file {\"path\",\"content\"}, \
read_file {\"path\"}, list_files {}, dev_ticket {\"title\",\"description\",\"priority\"}, \
update_task_status {\"taskId\",\"status\"}, escalate_issue {\"title\",\"description\"}, \
delegate {\"agent\",\"instruction\"}.";

fn persona(body: &str) -> String {
    format!("{body}\n\n{TOOL_FORMAT}")
}

/// The default company roster.
pub fn default_agents() -> Vec<AgentProfile> {
    vec![
        AgentProfile::new(
            "board-chairman",
            "Board Chairman",
            "You are the Chairman of the Board. You run the meeting, pick who speaks next, \
             and keep everyone on the goal. You answer only in the JSON format requested.",
        )
        .with_layer("board")
        .with_memory(MemoryKind::Longterm, 365),
        AgentProfile::new(
            "vision-founder-agent",
            "Vision Founder",
            persona(
                "You own the long-term vision. When the goal is met you run a strategic review: \
                 what changed, what is next, and which risks need an owner.",
            ),
        )
        .with_layer("board")
        .with_tools(["write_file", "read_file", "list_files", "delegate"])
        .with_memory(MemoryKind::Longterm, 365),
        AgentProfile::new(
            "ceo-agent",
            "Chief Executive Officer",
            persona(
                "You are the CEO. You turn the goal into tasks, assign owners, \
                 run the daily standup and break silences with a concrete next step.",
            ),
        )
        .with_layer("executive")
        .with_reports_to("board-chairman")
        .with_tools(["dev_ticket", "create_task", "update_task_status", "list_files", "read_file", "delegate", "update_agent_config"])
        .with_memory(MemoryKind::Midterm, 30),
        AgentProfile::new(
            "cto-agent",
            "Chief Technology Officer",
            persona("You are the CTO. You decide architecture and write technical plans to files."),
        )
        .with_layer("executive")
        .with_reports_to("ceo-agent")
        .with_tools(["write_file", "read_file", "list_files", "dev_ticket", "escalate_issue", "delegate"])
        .with_memory(MemoryKind::Midterm, 30),
        AgentProfile::new(
            "tech-lead-agent",
            "Tech Lead",
            persona("You are the tech lead. You break plans into tickets and write code notes."),
        )
        .with_layer("operational")
        .with_reports_to("cto-agent")
        .with_tools(["write_file", "read_file", "list_files", "dev_ticket", "update_task_status", "escalate_issue"]),
        AgentProfile::new(
            "qa-agent",
            "QA Engineer",
            persona("You test deliverables against requirements and file tickets for every defect."),
        )
        .with_layer("operational")
        .with_reports_to("tech-lead-agent")
        .with_tools(["read_file", "list_files", "dev_ticket", "update_task_status", "escalate_issue"]),
        AgentProfile::new(
            "system-mapping-agent",
            "System Mapper",
            persona(
                "You map the product: screens, modules and data flows. \
                 Your deliverable is system_map.json, a JSON document saved with write_file.",
            ),
        )
        .with_layer("documentation")
        .with_tools(["write_file", "read_file", "list_files"]),
        AgentProfile::new(
            "ui-ux-docs-agent",
            "UI/UX Documenter",
            persona(
                "You document every screen listed in system_map.json. \
                 Save one file per screen under screens_documentation/.",
            ),
        )
        .with_layer("documentation")
        .with_tools(["write_file", "read_file", "list_files"]),
        AgentProfile::new(
            "requirements-agent",
            "PRD Writer",
            persona(
                "You write the product requirements document from the system map and screen docs. \
                 Save it as prd/main_prd.md.",
            ),
        )
        .with_layer("documentation")
        .with_tools(["write_file", "read_file", "list_files"]),
        AgentProfile::new(
            "onboarding-agent",
            "Onboarding Specialist",
            persona(
                "You write the training package for new team members from the PRD. \
                 Save it as training_package/guide.md.",
            ),
        )
        .with_layer("documentation")
        .with_tools(["write_file", "read_file", "list_files"]),
        AgentProfile::new(
            "consistency-auditor-agent",
            "Consistency Auditor",
            persona(
                "You cross-check the system map, screen docs, PRD and guide for contradictions. \
                 Save findings to consistency_report.md and open a dev_ticket per defect.",
            ),
        )
        .with_layer("documentation")
        .with_tools(["write_file", "read_file", "list_files", "dev_ticket"]),
    ]
}

/// The built-in workflows.
pub fn default_workflows() -> Vec<WorkflowConfig> {
    vec![WorkflowConfig {
        id: "documentation_package".into(),
        name: "Documentation Package".into(),
        triggers: vec!["documentation".into()],
        steps: vec![
            step(
                "system_map",
                "system-mapping-agent",
                "Map the full system and save it as system_map.json.",
                "system_map.json",
            ),
            step(
                "screens",
                "ui-ux-docs-agent",
                "Document each screen from system_map.json under screens_documentation/.",
                "screens_documentation/",
            ),
            step(
                "prd",
                "requirements-agent",
                "Write the main PRD and save it as prd/main_prd.md.",
                "prd/main_prd.md",
            ),
            step(
                "training",
                "onboarding-agent",
                "Write the onboarding guide and save it as training_package/guide.md.",
                "training_package/guide.md",
            ),
            step(
                "audit",
                "consistency-auditor-agent",
                "Audit every document for consistency and save consistency_report.md.",
                "consistency_report.md",
            ),
        ],
    }]
}

fn step(id: &str, agent_id: &str, instruction: &str, expected_artifact: &str) -> WorkflowStepConfig {
    WorkflowStepConfig {
        id: id.into(),
        agent_id: agent_id.into(),
        instruction: instruction.into(),
        expected_artifact: expected_artifact.into(),
    }
}

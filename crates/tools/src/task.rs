//! Task tools: open, move and escalate tickets in the task store.

use async_trait::async_trait;
use boardroom_core::error::ToolError;
use boardroom_core::profile::AgentRegistry;
use boardroom_core::store::{NewTask, TaskPriority, TaskStatus, TaskStore, TaskUpdate};
use boardroom_core::tool::{Tool, ToolCall, ToolContext};
use std::sync::Arc;
use tracing::info;

/// Registered as `dev_ticket` with a `create_task` alias.
pub struct CreateTaskTool {
    tasks: Arc<dyn TaskStore>,
}

impl CreateTaskTool {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "dev_ticket"
    }

    fn description(&self) -> &str {
        "Open a task. Fields: title, description, priority (low|medium|high), optional assignee."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let title = call
            .str_arg(&["title", "summary"])
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'title' argument".into()))?;

        let mut new = NewTask::new(title.trim())
            .with_description(call.str_arg(&["description", "details"]).unwrap_or_default())
            .with_priority(TaskPriority::parse_lenient(call.str_arg(&["priority"]).unwrap_or("medium")));
        if let Some(assignee) = call.str_arg(&["assignee", "assigned_to", "assignedTo"]) {
            new = new.with_assignee(assignee);
        }

        let task = self.tasks.create(new).await?;
        info!(task_id = %task.id, agent_id = %ctx.agent_id, priority = task.priority.as_str(), "Task created");

        let owner = task.assigned_to.as_deref().unwrap_or("Unassigned");
        Ok(format!(
            "Created {} priority task '{}' ({}), owner: {owner}",
            task.priority.as_str(),
            task.title,
            task.id
        ))
    }
}

/// `update_task_status` {taskId, status}.
pub struct UpdateTaskStatusTool {
    tasks: Arc<dyn TaskStore>,
}

impl UpdateTaskStatusTool {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }
}

/// Accepts `In Progress`, `in-progress` and `in_progress` alike.
fn parse_status(raw: &str) -> Option<TaskStatus> {
    let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
    match normalized.as_str() {
        "completed" | "closed" => Some(TaskStatus::Done),
        other => TaskStatus::parse(other),
    }
}

#[async_trait]
impl Tool for UpdateTaskStatusTool {
    fn name(&self) -> &str {
        "update_task_status"
    }

    fn description(&self) -> &str {
        "Move a task to open, in_progress, pending or done. Fields: taskId, status."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let task_id = call
            .str_arg(&["taskId", "task_id", "id"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'taskId' argument".into()))?;
        let raw = call
            .str_arg(&["status"])
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'status' argument".into()))?;
        let status = parse_status(raw).ok_or_else(|| {
            ToolError::InvalidArguments(format!("Unknown status '{raw}', use open, in_progress, pending or done"))
        })?;

        let update = TaskUpdate {
            status: Some(status),
            ..TaskUpdate::default()
        };
        let Some(task) = self.tasks.update(task_id, update).await? else {
            return Err(ToolError::NotFound(format!("task {task_id}")));
        };
        info!(task_id = %task.id, agent_id = %ctx.agent_id, status = status.as_str(), "Task status updated");
        Ok(format!("Task '{}' ({}) is now {}", task.title, task.id, status.as_str()))
    }
}

/// `escalate_issue` {title, description}: a high priority task for the
/// caller's manager.
pub struct EscalateIssueTool {
    tasks: Arc<dyn TaskStore>,
    registry: Arc<AgentRegistry>,
}

impl EscalateIssueTool {
    pub fn new(tasks: Arc<dyn TaskStore>, registry: Arc<AgentRegistry>) -> Self {
        Self { tasks, registry }
    }
}

#[async_trait]
impl Tool for EscalateIssueTool {
    fn name(&self) -> &str {
        "escalate_issue"
    }

    fn description(&self) -> &str {
        "Escalate an issue to the agent you report to. Fields: title, description."
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let title = call
            .str_arg(&["title", "summary"])
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'title' argument".into()))?;
        let Some(manager) = self
            .registry
            .get(&ctx.agent_id)
            .and_then(|profile| profile.reports_to.as_deref())
        else {
            return Ok(format!("{} has no manager to escalate to.", ctx.agent_id));
        };

        let description = call.str_arg(&["description", "details"]).unwrap_or_default();
        let new = NewTask::new(format!("[ESCALATION] {}", title.trim()))
            .with_description(format!("Escalated by {}: {description}", ctx.agent_id))
            .with_priority(TaskPriority::High)
            .with_assignee(manager);
        let task = self.tasks.create(new).await?;
        info!(task_id = %task.id, agent_id = %ctx.agent_id, manager, "Issue escalated");

        Ok(format!("Issue escalated to {manager} as task {}", task.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_core::profile::AgentProfile;
    use boardroom_memory::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn creates_unassigned_ticket() {
        let store = Arc::new(InMemoryStore::new());
        let tool = CreateTaskTool::new(store.clone());
        let call = ToolCall::from_value(
            "dev_ticket",
            json!({"title": "Login page mismatch", "description": "PRD says email, map says phone", "priority": "HIGH"}),
        );
        let out = tool.execute(&call, &ToolContext::new("p", "consistency-auditor-agent")).await.unwrap();
        assert!(out.contains("high priority"));
        assert!(out.contains("Unassigned"));

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, TaskPriority::High);
        assert!(tasks[0].is_unassigned());
    }

    #[tokio::test]
    async fn assignee_is_recorded() {
        let store = Arc::new(InMemoryStore::new());
        let tool = CreateTaskTool::new(store.clone());
        let call = ToolCall::from_value("create_task", json!({"title": "QA pass", "assignee": "qa-agent"}));
        tool.execute(&call, &ToolContext::new("p", "ceo-agent")).await.unwrap();
        assert_eq!(store.list().await.unwrap()[0].assigned_to.as_deref(), Some("qa-agent"));
    }

    #[tokio::test]
    async fn blank_title_rejected() {
        let tool = CreateTaskTool::new(Arc::new(InMemoryStore::new()));
        let call = ToolCall::from_value("dev_ticket", json!({"title": "  "}));
        assert!(tool.execute(&call, &ToolContext::new("p", "a")).await.is_err());
    }

    #[tokio::test]
    async fn status_update_reaches_the_store() {
        let store = Arc::new(InMemoryStore::new());
        let task = store.create(NewTask::new("Fix login")).await.unwrap();
        let tool = UpdateTaskStatusTool::new(store.clone());

        let call = ToolCall::from_value("update_task_status", json!({"taskId": task.id, "status": "In Progress"}));
        let out = tool.execute(&call, &ToolContext::new("p", "tech-lead-agent")).await.unwrap();
        assert!(out.ends_with("is now in_progress"));
        assert_eq!(store.list().await.unwrap()[0].status, TaskStatus::InProgress);

        let call = ToolCall::from_value("update_task_status", json!({"taskId": task.id, "status": "completed"}));
        tool.execute(&call, &ToolContext::new("p", "tech-lead-agent")).await.unwrap();
        assert_eq!(store.list().await.unwrap()[0].status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn status_update_rejects_bad_input() {
        let store = Arc::new(InMemoryStore::new());
        let task = store.create(NewTask::new("Fix login")).await.unwrap();
        let tool = UpdateTaskStatusTool::new(store.clone());
        let ctx = ToolContext::new("p", "qa-agent");

        let unknown_task = ToolCall::from_value("update_task_status", json!({"taskId": "nope", "status": "done"}));
        assert!(matches!(tool.execute(&unknown_task, &ctx).await, Err(ToolError::NotFound(_))));

        let bad_status = ToolCall::from_value("update_task_status", json!({"taskId": task.id, "status": "someday"}));
        assert!(matches!(tool.execute(&bad_status, &ctx).await, Err(ToolError::InvalidArguments(_))));
        assert_eq!(store.list().await.unwrap()[0].status, TaskStatus::Open);
    }

    fn org_chart() -> Arc<AgentRegistry> {
        Arc::new(AgentRegistry::new(vec![
            AgentProfile::new("ceo-agent", "CEO", "Lead."),
            AgentProfile::new("cto-agent", "CTO", "Build.").with_reports_to("ceo-agent"),
        ]))
    }

    #[tokio::test]
    async fn escalation_goes_to_the_manager() {
        let store = Arc::new(InMemoryStore::new());
        let tool = EscalateIssueTool::new(store.clone(), org_chart());
        let call = ToolCall::from_value(
            "escalate_issue",
            json!({"title": "Vendor API down", "description": "Blocks the release"}),
        );

        let out = tool.execute(&call, &ToolContext::new("p", "cto-agent")).await.unwrap();
        assert!(out.starts_with("Issue escalated to ceo-agent"));

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "[ESCALATION] Vendor API down");
        assert_eq!(tasks[0].description, "Escalated by cto-agent: Blocks the release");
        assert_eq!(tasks[0].priority, TaskPriority::High);
        assert_eq!(tasks[0].assigned_to.as_deref(), Some("ceo-agent"));
    }

    #[tokio::test]
    async fn escalation_without_manager_creates_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let tool = EscalateIssueTool::new(store.clone(), org_chart());
        let call = ToolCall::from_value("escalate_issue", json!({"title": "Board approval"}));

        let out = tool.execute(&call, &ToolContext::new("p", "ceo-agent")).await.unwrap();
        assert_eq!(out, "ceo-agent has no manager to escalate to.");
        assert!(store.list().await.unwrap().is_empty());
    }
}

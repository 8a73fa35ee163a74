//! Human approval gate for sensitive tools.
//!
//! A sensitive tool is registered wrapped in [`GatedTool`]. Calling it
//! records a [`PendingApproval`] and fails with
//! [`ToolError::AwaitingApproval`] instead of running. The principal later resolves it with [`ApprovalGate::approve`]
//! (runs the stored call) or [`ApprovalGate::reject`] (drops it).

use async_trait::async_trait;
use boardroom_core::error::ToolError;
use boardroom_core::tool::{Tool, ToolCall, ToolContext};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// A call waiting for the principal's decision.
#[derive(Clone)]
pub struct PendingApproval {
    pub id: String,
    pub call: ToolCall,
    pub context: ToolContext,
    pub requested_at: DateTime<Utc>,
    tool: Arc<dyn Tool>,
}

impl std::fmt::Debug for PendingApproval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingApproval")
            .field("id", &self.id)
            .field("tool", &self.call.name)
            .field("agent_id", &self.context.agent_id)
            .field("requested_at", &self.requested_at)
            .finish()
    }
}

#[derive(Default)]
pub struct ApprovalGate {
    pending: Mutex<HashMap<String, PendingApproval>>,
}

impl ApprovalGate {
    pub fn new() -> Self {
        Self::default()
    }

    async fn request(&self, tool: Arc<dyn Tool>, call: &ToolCall, ctx: &ToolContext) -> String {
        let id = Uuid::new_v4().to_string();
        info!(approval_id = %id, tool = %call.name, agent_id = %ctx.agent_id, "Tool call paused for approval");
        self.pending.lock().await.insert(
            id.clone(),
            PendingApproval {
                id: id.clone(),
                call: call.clone(),
                context: ctx.clone(),
                requested_at: Utc::now(),
                tool,
            },
        );
        id
    }

    /// Pending approvals, oldest first.
    pub async fn pending(&self) -> Vec<PendingApproval> {
        let mut all: Vec<PendingApproval> = self.pending.lock().await.values().cloned().collect();
        all.sort_by_key(|p| p.requested_at);
        all
    }

    /// Run the stored call and return its rendered result.
    pub async fn approve(&self, id: &str) -> Result<String, ToolError> {
        let approval = self
            .pending
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| ToolError::NotFound(format!("approval {id}")))?;

        info!(approval_id = id, tool = %approval.call.name, "Approved tool call executing");
        match approval.tool.execute(&approval.call, &approval.context).await {
            Ok(output) => Ok(output),
            Err(e) => Ok(format!("Error: {e}")),
        }
    }

    /// Discard a pending call. Returns whether it existed.
    pub async fn reject(&self, id: &str) -> bool {
        let removed = self.pending.lock().await.remove(id).is_some();
        if removed {
            info!(approval_id = id, "Tool call rejected");
        }
        removed
    }
}

/// Wraps a tool so every call goes through the gate.
pub struct GatedTool {
    inner: Arc<dyn Tool>,
    gate: Arc<ApprovalGate>,
}

impl GatedTool {
    pub fn new(inner: Arc<dyn Tool>, gate: Arc<ApprovalGate>) -> Self {
        Self { inner, gate }
    }
}

#[async_trait]
impl Tool for GatedTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<String, ToolError> {
        let approval_id = self.gate.request(self.inner.clone(), call, ctx).await;
        Err(ToolError::AwaitingApproval { approval_id })
    }
}

//! Workflow engine: artifact-gated step sequencing and the heartbeat scheduler.
//!
//! A [`WorkflowDefinition`] is an ordered list of steps. Each step names the
//! agent that owns it and the artifact it must produce. The engine never
//! tracks progress itself: the artifact store is the only state, so
//! [`WorkflowDefinition::decide`] is a pure function of the stored paths.

pub mod heartbeat;

pub use heartbeat::{Heartbeat, HeartbeatInput, HeartbeatProbe, HeartbeatScheduler};

use boardroom_config::{WorkflowConfig, WorkflowStepConfig};
use boardroom_core::decision::OrchestrationDecision;
use boardroom_core::store::normalize_path;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reason attached to the termination decision once every artifact exists.
pub const WORKFLOW_COMPLETE: &str = "All workflow steps completed successfully.";

// ── Definitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub id: String,
    pub agent_id: String,
    pub instruction: String,
    pub expected_artifact: String,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        agent_id: impl Into<String>,
        instruction: impl Into<String>,
        expected_artifact: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            instruction: instruction.into(),
            expected_artifact: expected_artifact.into(),
        }
    }

    /// Whether this step's artifact is among `paths`.
    pub fn is_satisfied(&self, paths: &[String]) -> bool {
        artifact_present(&self.expected_artifact, paths)
    }
}

impl From<&WorkflowStepConfig> for WorkflowStep {
    fn from(config: &WorkflowStepConfig) -> Self {
        Self::new(
            &config.id,
            &config.agent_id,
            &config.instruction,
            &config.expected_artifact,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub triggers: Vec<String>,
    pub steps: Vec<WorkflowStep>,
}

/// How far a workflow has got, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowProgress {
    pub completed: usize,
    pub total: usize,
    pub current: Option<WorkflowStep>,
}

impl WorkflowProgress {
    pub fn is_complete(&self) -> bool {
        self.current.is_none()
    }
}

impl WorkflowDefinition {
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            triggers: Vec::new(),
            steps,
        }
    }

    pub fn with_triggers(mut self, triggers: &[&str]) -> Self {
        self.triggers = triggers.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        let name = if config.name.is_empty() {
            config.id.clone()
        } else {
            config.name.clone()
        };
        Self {
            id: config.id.clone(),
            name,
            triggers: config.triggers.clone(),
            steps: config.steps.iter().map(WorkflowStep::from).collect(),
        }
    }

    /// Case-insensitive trigger match against a goal.
    pub fn matches_goal(&self, goal: &str) -> bool {
        let goal = goal.to_lowercase();
        self.triggers
            .iter()
            .filter(|t| !t.trim().is_empty())
            .any(|t| goal.contains(&t.to_lowercase()))
    }

    /// First step whose artifact is missing.
    pub fn current_step(&self, paths: &[String]) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| !step.is_satisfied(paths))
    }

    /// Pick the next speaker from artifact presence alone.
    ///
    /// Steps are scanned in order, so a later artifact created early never
    /// skips an earlier missing one.
    pub fn decide(&self, paths: &[String]) -> OrchestrationDecision {
        match self.current_step(paths) {
            Some(step) => {
                debug!(workflow = %self.id, step = %step.id, agent_id = %step.agent_id, "Workflow step pending");
                OrchestrationDecision::speak(
                    &step.agent_id,
                    format!(
                        "Executing workflow step {}. Waiting for artifact {}",
                        step.id, step.expected_artifact
                    ),
                    &step.instruction,
                )
            }
            None => {
                debug!(workflow = %self.id, "Workflow complete");
                OrchestrationDecision::terminate(WORKFLOW_COMPLETE)
            }
        }
    }

    pub fn progress(&self, paths: &[String]) -> WorkflowProgress {
        WorkflowProgress {
            completed: self.steps.iter().filter(|s| s.is_satisfied(paths)).count(),
            total: self.steps.len(),
            current: self.current_step(paths).cloned(),
        }
    }
}

/// Exact match, or a stored path under the expected directory prefix.
///
/// `expected` is normalized the way stores normalize what they hold, so
/// `./final.md` and `/final.md` both mean `final.md`. A path that cannot be
/// normalized is never present.
pub fn artifact_present(expected: &str, paths: &[String]) -> bool {
    let Ok(expected) = normalize_path(expected) else {
        return false;
    };
    paths.iter().any(|p| p.starts_with(expected.as_str()))
}

// ── Catalog ─────────────────────────────────────────────────────────────────

/// The configured workflows, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    workflows: Vec<WorkflowDefinition>,
}

impl WorkflowCatalog {
    pub fn new(workflows: Vec<WorkflowDefinition>) -> Self {
        Self { workflows }
    }

    pub fn from_config(configs: &[WorkflowConfig]) -> Self {
        Self::new(configs.iter().map(WorkflowDefinition::from_config).collect())
    }

    /// First workflow whose trigger appears in `goal`.
    pub fn select(&self, goal: &str) -> Option<&WorkflowDefinition> {
        self.workflows.iter().find(|w| w.matches_goal(goal))
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowDefinition> {
        self.workflows.iter().find(|w| w.id == id)
    }

    pub fn workflows(&self) -> &[WorkflowDefinition] {
        &self.workflows
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

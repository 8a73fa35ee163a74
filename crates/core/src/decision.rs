//! Orchestration decisions: who speaks next.

use serde::{Deserialize, Serialize};

/// Reserved speaker id meaning "stop the session".
pub const TERMINATE: &str = "TERMINATE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TeamAction {
    Add,
    Remove,
}

/// A request to change the session's active agent set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamChange {
    pub action: TeamAction,
    #[serde(alias = "agentId")]
    pub agent_id: String,
    #[serde(default)]
    pub reason: String,
}

/// The orchestrator's answer to "what happens next".
///
/// Chairman output uses camelCase keys (`nextSpeakerId`, `manageTeam`), which
/// are accepted as aliases. A `manageTeam` whose `action` is null or missing
/// deserializes as no team change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationDecision {
    #[serde(alias = "nextSpeakerId")]
    pub next_speaker_id: String,

    #[serde(default)]
    pub reason: String,

    #[serde(default)]
    pub instruction: String,

    #[serde(
        default,
        alias = "manageTeam",
        alias = "teamChange",
        deserialize_with = "deserialize_team_change",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_change: Option<TeamChange>,

    /// Set when the speaker must perform a concrete action this turn
    #[serde(default, alias = "requiresAction")]
    pub requires_action: bool,
}

impl OrchestrationDecision {
    pub fn speak(
        next_speaker_id: impl Into<String>,
        reason: impl Into<String>,
        instruction: impl Into<String>,
    ) -> Self {
        Self {
            next_speaker_id: next_speaker_id.into(),
            reason: reason.into(),
            instruction: instruction.into(),
            team_change: None,
            requires_action: false,
        }
    }

    pub fn terminate(reason: impl Into<String>) -> Self {
        Self::speak(TERMINATE, reason, "")
    }

    pub fn with_team_change(mut self, change: TeamChange) -> Self {
        self.team_change = Some(change);
        self
    }

    pub fn is_terminate(&self) -> bool {
        self.next_speaker_id == TERMINATE
    }
}

#[derive(Deserialize)]
struct RawTeamChange {
    #[serde(default)]
    action: Option<TeamAction>,
    #[serde(default, alias = "agentId")]
    agent_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

fn deserialize_team_change<'de, D>(deserializer: D) -> Result<Option<TeamChange>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<RawTeamChange> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|r| match (r.action, r.agent_id) {
        (Some(action), Some(agent_id)) if !agent_id.is_empty() => Some(TeamChange {
            action,
            agent_id,
            reason: r.reason.unwrap_or_default(),
        }),
        _ => None,
    }))
}

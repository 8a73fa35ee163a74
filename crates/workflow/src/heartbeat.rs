//! Heartbeat: decide whether the board should act with no new input.
//!
//! [`Heartbeat::tick`] is stateless. Everything it needs arrives in the
//! [`HeartbeatInput`] or is read from the task store on the spot.
//! [`HeartbeatScheduler`] runs it on a tokio interval and forwards any
//! decision over a channel for the caller to feed into the turn loop.

use async_trait::async_trait;
use boardroom_config::HeartbeatConfig;
use boardroom_core::decision::OrchestrationDecision;
use boardroom_core::store::{Task, TaskPriority, TaskStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What the caller knows about the company when a tick fires.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatInput {
    /// Free-form company state; only `status` is inspected here
    pub company_state: serde_json::Value,
    pub active_meeting: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
}

impl HeartbeatInput {
    pub fn idle() -> Self {
        Self {
            company_state: serde_json::json!({ "status": "IDLE" }),
            ..Self::default()
        }
    }

    pub fn in_meeting(meeting_id: impl Into<String>, last_message_time: DateTime<Utc>) -> Self {
        Self {
            active_meeting: Some(meeting_id.into()),
            last_message_time: Some(last_message_time),
            ..Self::default()
        }
    }

    fn is_idle(&self) -> bool {
        self.company_state.get("status").and_then(|s| s.as_str()) == Some("IDLE")
    }
}

pub struct Heartbeat {
    config: HeartbeatConfig,
    tasks: Arc<dyn TaskStore>,
}

impl Heartbeat {
    pub fn new(config: HeartbeatConfig, tasks: Arc<dyn TaskStore>) -> Self {
        Self { config, tasks }
    }

    pub fn config(&self) -> &HeartbeatConfig {
        &self.config
    }

    pub async fn tick(&self, input: &HeartbeatInput, now: DateTime<Utc>) -> Option<OrchestrationDecision> {
        match &input.active_meeting {
            None => self.tick_between_meetings(input).await,
            Some(meeting) => {
                let last = input.last_message_time?;
                let silent_secs = (now - last).num_seconds();
                if silent_secs > self.config.silence_threshold_secs as i64 {
                    info!(meeting = %meeting, silent_secs, "Meeting silent, nudging");
                    Some(OrchestrationDecision::speak(
                        &self.config.nudge_agent,
                        "The room has been silent for too long.",
                        "Nudge.",
                    ))
                } else {
                    None
                }
            }
        }
    }

    async fn tick_between_meetings(&self, input: &HeartbeatInput) -> Option<OrchestrationDecision> {
        let tasks = match self.tasks.list().await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Heartbeat could not read tasks");
                Vec::new()
            }
        };

        if let Some(task) = pick_task(&tasks)
            && task.is_unassigned()
        {
            info!(task_id = %task.id, "Unassigned task found");
            return Some(OrchestrationDecision::speak(
                &self.config.assignment_agent,
                "There are unassigned tasks.",
                format!("Task '{}' is unassigned. Assign it to a relevant agent.", task.title),
            ));
        }

        if input.is_idle() {
            info!("Company idle, starting standup");
            return Some(OrchestrationDecision::speak(
                &self.config.standup_agent,
                "Initiating Daily Standup Routine",
                "Start the meeting.",
            ));
        }

        debug!("Heartbeat: nothing to do");
        None
    }
}

/// First active high-priority task, else the first active task.
fn pick_task(tasks: &[Task]) -> Option<&Task> {
    let active: Vec<&Task> = tasks.iter().filter(|t| t.is_active()).collect();
    active
        .iter()
        .find(|t| t.priority == TaskPriority::High)
        .or(active.first())
        .copied()
}

/// Supplies fresh input for each scheduled tick.
#[async_trait]
pub trait HeartbeatProbe: Send + Sync {
    async fn probe(&self) -> HeartbeatInput;
}

/// Runs [`Heartbeat::tick`] every `interval_secs`.
pub struct HeartbeatScheduler {
    heartbeat: Arc<Heartbeat>,
    interval_secs: u64,
}

impl HeartbeatScheduler {
    pub fn new(heartbeat: Arc<Heartbeat>) -> Self {
        let interval_secs = heartbeat.config.interval_secs.max(1);
        Self {
            heartbeat,
            interval_secs,
        }
    }

    /// Start the background loop.
    ///
    /// Returns a receiver of heartbeat decisions and the loop's join handle.
    /// The loop ends when the receiver is dropped.
    pub fn start(
        &self,
        probe: Arc<dyn HeartbeatProbe>,
    ) -> (mpsc::Receiver<OrchestrationDecision>, tokio::task::JoinHandle<()>) {
        let heartbeat = self.heartbeat.clone();
        let period = tokio::time::Duration::from_secs(self.interval_secs);
        let (tx, rx) = mpsc::channel::<OrchestrationDecision>(16);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if tx.is_closed() {
                    debug!("Heartbeat receiver dropped, stopping scheduler");
                    return;
                }

                let input = probe.probe().await;
                let Some(decision) = heartbeat.tick(&input, Utc::now()).await else {
                    continue;
                };
                debug!(next_speaker = %decision.next_speaker_id, "Heartbeat decision");
                if tx.send(decision).await.is_err() {
                    debug!("Heartbeat receiver dropped, stopping scheduler");
                    return;
                }
            }
        });

        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardroom_core::error::StoreError;
    use boardroom_core::store::{NewTask, StoreResult, TaskUpdate};
    use boardroom_memory::InMemoryStore;
    use chrono::Duration;

    fn heartbeat(store: Arc<dyn TaskStore>) -> Heartbeat {
        Heartbeat::new(HeartbeatConfig::default(), store)
    }

    #[tokio::test]
    async fn unassigned_task_goes_to_assignment_agent() {
        let store = Arc::new(InMemoryStore::new());
        store.create(NewTask::new("Low chore").with_assignee("qa-agent")).await.unwrap();
        store
            .create(NewTask::new("Fix login").with_priority(TaskPriority::High))
            .await
            .unwrap();

        let d = heartbeat(store).tick(&HeartbeatInput::idle(), Utc::now()).await.unwrap();
        assert_eq!(d.next_speaker_id, "ceo-agent");
        assert_eq!(d.reason, "There are unassigned tasks.");
        assert_eq!(d.instruction, "Task 'Fix login' is unassigned. Assign it to a relevant agent.");
    }

    #[tokio::test]
    async fn assigned_task_falls_through_to_standup() {
        let store = Arc::new(InMemoryStore::new());
        store.create(NewTask::new("QA pass").with_assignee("qa-agent")).await.unwrap();

        let d = heartbeat(store).tick(&HeartbeatInput::idle(), Utc::now()).await.unwrap();
        assert_eq!(d.reason, "Initiating Daily Standup Routine");
        assert_eq!(d.instruction, "Start the meeting.");
    }

    #[tokio::test]
    async fn busy_company_with_no_tasks_does_nothing() {
        let input = HeartbeatInput {
            company_state: serde_json::json!({"status": "WORKING"}),
            ..HeartbeatInput::default()
        };
        let hb = heartbeat(Arc::new(InMemoryStore::new()));
        assert!(hb.tick(&input, Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn silent_meeting_is_nudged() {
        let hb = heartbeat(Arc::new(InMemoryStore::new()));
        let now = Utc::now();

        let quiet = HeartbeatInput::in_meeting("m1", now - Duration::seconds(60));
        let d = hb.tick(&quiet, now).await.unwrap();
        assert_eq!(d.reason, "The room has been silent for too long.");
        assert_eq!(d.instruction, "Nudge.");

        let lively = HeartbeatInput::in_meeting("m1", now - Duration::seconds(10));
        assert!(hb.tick(&lively, now).await.is_none());
    }

    struct BrokenTasks;

    #[async_trait]
    impl TaskStore for BrokenTasks {
        async fn create(&self, _task: NewTask) -> StoreResult<Task> {
            Err(StoreError::Storage("down".into()))
        }
        async fn list(&self) -> StoreResult<Vec<Task>> {
            Err(StoreError::Storage("down".into()))
        }
        async fn update(&self, _id: &str, _update: TaskUpdate) -> StoreResult<Option<Task>> {
            Err(StoreError::Storage("down".into()))
        }
    }

    #[tokio::test]
    async fn task_store_failure_counts_as_no_tasks() {
        let d = heartbeat(Arc::new(BrokenTasks))
            .tick(&HeartbeatInput::idle(), Utc::now())
            .await
            .unwrap();
        assert_eq!(d.reason, "Initiating Daily Standup Routine");
    }

    struct IdleProbe;

    #[async_trait]
    impl HeartbeatProbe for IdleProbe {
        async fn probe(&self) -> HeartbeatInput {
            HeartbeatInput::idle()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_emits_and_stops_when_receiver_drops() {
        let hb = Arc::new(heartbeat(Arc::new(InMemoryStore::new())));
        let scheduler = HeartbeatScheduler::new(hb);
        let (mut rx, handle) = scheduler.start(Arc::new(IdleProbe));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.next_speaker_id, "ceo-agent");
        let second = rx.recv().await.unwrap();
        assert_eq!(second, first);

        drop(rx);
        handle.await.unwrap();
    }
}

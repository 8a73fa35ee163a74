//! Domain event system for decoupled observation of the orchestrator.
//!
//! Events are published when a decision is made, a turn completes, a tool
//! runs, and so on. Subscribers (the CLI transcript printer, tests) react
//! without the publisher knowing about them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The orchestrator chose the next speaker (or termination)
    DecisionMade {
        next_speaker_id: String,
        reason: String,
        workflow: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Chairman output could not be parsed; the default decision was used
    DecisionFallback {
        raw_preview: String,
        timestamp: DateTime<Utc>,
    },

    /// An agent finished a turn
    TurnCompleted {
        agent_id: String,
        turn: u32,
        tool: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed
    ToolExecuted {
        tool_name: String,
        agent_id: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// One agent handed a sub-instruction to another
    DelegationCompleted {
        from_agent: String,
        to_agent: String,
        timestamp: DateTime<Utc>,
    },

    /// A memory write failed; the turn still succeeded
    PersistenceFailed {
        agent_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },

    /// The loop cap was reached
    LoopSuspended {
        turns: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::DelegationCompleted {
            from_agent: "ceo-agent".into(),
            to_agent: "qa-agent".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::DelegationCompleted { from_agent, to_agent, .. } => {
                assert_eq!(from_agent, "ceo-agent");
                assert_eq!(to_agent, "qa-agent");
            }
            _ => panic!("Expected DelegationCompleted event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::LoopSuspended {
            turns: 10,
            timestamp: Utc::now(),
        });
    }
}

//! Event-driven driving of a session from a persisted history.
//!
//! A host calls [`Poller::tick`] on its own schedule. Each tick advances the
//! session by at most one iteration, and only when the stored history has a
//! message the poller has not reacted to yet. Ticks that arrive while one is
//! still running are skipped, not queued.

use crate::turn_loop::{Session, StepOutcome, TurnLoop};
use boardroom_core::error::Result;
use boardroom_core::store::HistoryStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// At most one holder at a time; acquisition never waits.
#[derive(Debug, Default)]
pub struct SingleFlight {
    busy: AtomicBool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if another flight is in progress.
    pub fn try_acquire(&self) -> Option<FlightGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the flight when dropped, including on early return or error.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// Another tick was still running
    Skipped,
    /// Nothing new in the history
    Idle,
    /// The session used up its turn allowance
    Suspended,
    Advanced(StepOutcome),
}

struct PollState {
    driver: TurnLoop,
    session: Session,
    last_seen: Option<String>,
}

pub struct Poller {
    history: Arc<dyn HistoryStore>,
    session_id: String,
    flight: SingleFlight,
    state: Mutex<PollState>,
}

impl Poller {
    pub fn new(
        driver: TurnLoop,
        session: Session,
        history: Arc<dyn HistoryStore>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            history,
            session_id: session_id.into(),
            flight: SingleFlight::new(),
            state: Mutex::new(PollState {
                driver,
                session,
                last_seen: None,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn tick(&self) -> Result<PollOutcome> {
        let Some(_flight) = self.flight.try_acquire() else {
            debug!(session_id = %self.session_id, "Tick skipped, previous tick still running");
            return Ok(PollOutcome::Skipped);
        };

        let mut state = self.state.lock().await;
        let messages = self.history.load_history(&self.session_id).await?;
        let Some(newest) = messages.last() else {
            return Ok(PollOutcome::Idle);
        };
        if state.last_seen.as_deref() == Some(newest.id.as_str()) {
            return Ok(PollOutcome::Idle);
        }
        state.last_seen = Some(newest.id.clone());

        let PollState { driver, session, .. } = &mut *state;
        if session.turns >= driver.max_turns() {
            debug!(session_id = %self.session_id, turns = session.turns, "Session suspended");
            return Ok(PollOutcome::Suspended);
        }

        session.history = messages;
        let seen = session.history.len();
        let outcome = driver.step(session).await?;

        for message in &session.history[seen..] {
            if let Err(e) = self.history.append_history(&self.session_id, message).await {
                warn!(session_id = %self.session_id, error = %e, "Failed to append history");
                return Err(e.into());
            }
        }
        Ok(PollOutcome::Advanced(outcome))
    }

    /// Grant a suspended session a fresh turn allowance.
    pub async fn resume(&self) {
        let mut state = self.state.lock().await;
        state.session.reset_allowance();
        state.last_seen = None;
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("session_id", &self.session_id)
            .field("busy", &self.flight.is_busy())
            .finish()
    }
}

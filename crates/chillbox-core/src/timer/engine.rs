//! Pomodoro session engine.
//!
//! The engine is a tick-driven state machine. It owns no clock and no
//! thread: something outside (usually [`super::PomodoroTimer`]) calls
//! `tick()` once per elapsed second while the countdown is running.
//!
//! ## Session rotation
//!
//! ```text
//! Work      -> LongRest   every `sessions_before_long_rest`-th completed work session
//! Work      -> ShortRest  otherwise
//! ShortRest -> Work
//! LongRest  -> Work
//! ```
//!
//! Leaving `Work` bumps the completed-work counter before the long-rest test
//! runs; entering `LongRest` clears it again.
//!
//! ## Usage
//!
//! ```
//! use chillbox_core::timer::{EngineConfig, PomodoroEngine, SessionType};
//!
//! let mut engine = PomodoroEngine::new(EngineConfig {
//!     work_minutes: 1,
//!     ..EngineConfig::default()
//! });
//! engine.start();
//! for _ in 0..60 {
//!     engine.tick();
//! }
//! assert_eq!(engine.state().current_session, SessionType::ShortRest);
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::observer::{ObserverId, ObserverRegistry, StateObserver};
use super::session::{EngineConfig, SessionType, SkipBehavior};
use crate::events::Event;
use crate::format::format_time;

/// Published, read-only view of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub current_session: SessionType,
    pub remaining_seconds: u64,
    pub is_running: bool,
    pub completed_work_sessions: u32,
}

impl EngineState {
    /// Canonical start state: a fresh, paused work session.
    pub fn initial(config: &EngineConfig) -> Self {
        Self {
            current_session: SessionType::Work,
            remaining_seconds: config.duration_secs(SessionType::Work),
            is_running: false,
            completed_work_sessions: 0,
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_time(self.remaining_seconds)
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::initial(&EngineConfig::default())
    }
}

/// Core Pomodoro engine. One instance per open Pomodoro screen.
#[derive(Debug)]
pub struct PomodoroEngine {
    config: EngineConfig,
    skip_behavior: SkipBehavior,
    state: EngineState,
    observers: ObserverRegistry,
}

impl Default for PomodoroEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PomodoroEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            skip_behavior: SkipBehavior::default(),
            state: EngineState::initial(&config),
            observers: ObserverRegistry::default(),
        }
    }

    pub fn with_skip_behavior(mut self, skip_behavior: SkipBehavior) -> Self {
        self.skip_behavior = skip_behavior;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn skip_behavior(&self) -> SkipBehavior {
        self.skip_behavior
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    /// Full length of the active session in seconds.
    pub fn total_seconds(&self) -> u64 {
        self.config.duration_secs(self.state.current_session)
    }

    /// 0.0 .. 1.0 progress within the active session.
    pub fn session_progress(&self) -> f64 {
        let total = self.total_seconds();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.state.remaining_seconds as f64 / total as f64)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            session: self.state.current_session,
            remaining_secs: self.state.remaining_seconds,
            total_secs: self.total_seconds(),
            is_running: self.state.is_running,
            completed_work_sessions: self.state.completed_work_sessions,
            display: self.state.display(),
            at: Utc::now(),
        }
    }

    // ── Observers ────────────────────────────────────────────────────

    /// Register an observer. It is called with the new state after every
    /// change, in subscription order.
    pub fn subscribe<O>(&mut self, observer: O) -> ObserverId
    where
        O: StateObserver + 'static,
    {
        self.observers.add(Box::new(observer))
    }

    pub(crate) fn subscribe_with_id(&mut self, id: ObserverId, observer: Box<dyn StateObserver>) {
        self.observers.insert(id, observer);
    }

    pub(crate) fn next_observer_id(&self) -> u64 {
        self.observers.next_id()
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn set_work_minutes(&mut self, minutes: u32) -> Option<Event> {
        self.set_session_minutes(SessionType::Work, minutes)
    }

    pub fn set_short_rest_minutes(&mut self, minutes: u32) -> Option<Event> {
        self.set_session_minutes(SessionType::ShortRest, minutes)
    }

    pub fn set_long_rest_minutes(&mut self, minutes: u32) -> Option<Event> {
        self.set_session_minutes(SessionType::LongRest, minutes)
    }

    /// Update one session duration. If that session is the active one the
    /// countdown is retimed to the full new duration straight away, running
    /// or not.
    pub fn set_session_minutes(&mut self, session: SessionType, minutes: u32) -> Option<Event> {
        self.config.set_minutes(session, minutes);
        let rebased = self.state.current_session == session;
        debug!(%session, minutes, rebased, "session duration changed");
        if rebased {
            self.state.remaining_seconds = self.config.duration_secs(session);
            self.publish();
        }
        Some(Event::DurationChanged {
            session,
            minutes,
            rebased,
            at: Utc::now(),
        })
    }

    pub fn set_skip_behavior(&mut self, skip_behavior: SkipBehavior) {
        self.skip_behavior = skip_behavior;
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_running {
            return None;
        }
        if self.state.remaining_seconds == 0 {
            // Nothing left to count: roll over before starting.
            self.complete_session();
        }
        self.state.is_running = true;
        debug!(
            session = %self.state.current_session,
            remaining = self.state.remaining_seconds,
            "timer started"
        );
        self.publish();
        Some(Event::TimerStarted {
            session: self.state.current_session,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.is_running = false;
        debug!(remaining = self.state.remaining_seconds, "timer paused");
        self.publish();
        Some(Event::TimerPaused {
            session: self.state.current_session,
            remaining_secs: self.state.remaining_seconds,
            at: Utc::now(),
        })
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.state = EngineState::initial(&self.config);
        debug!("timer reset");
        self.publish();
        Some(Event::TimerReset { at: Utc::now() })
    }

    /// End the active session early. The next session is left paused unless
    /// the engine was built with [`SkipBehavior::AutoResume`].
    pub fn skip(&mut self) -> Option<Event> {
        let from = self.state.current_session;
        self.state.is_running = false;
        let to = self.complete_session();
        let resumed = self.skip_behavior == SkipBehavior::AutoResume;
        self.state.is_running = resumed;
        info!(%from, %to, resumed, "session skipped");
        self.publish();
        Some(Event::SessionSkipped {
            from,
            to,
            completed_work_sessions: self.state.completed_work_sessions,
            resumed,
            at: Utc::now(),
        })
    }

    /// Advance the countdown by one second. Returns
    /// `Some(Event::SessionCompleted)` when the session runs out; the next
    /// session then starts counting on its own.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds > 0 {
            self.publish();
            return None;
        }

        let from = self.state.current_session;
        self.state.is_running = false;
        let to = self.complete_session();
        self.state.is_running = true;
        info!(
            %from,
            %to,
            completed = self.state.completed_work_sessions,
            "session completed"
        );
        self.publish();
        Some(Event::SessionCompleted {
            from,
            to,
            completed_work_sessions: self.state.completed_work_sessions,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Move to the next session and load its full duration. Does not touch
    /// `is_running` and does not publish.
    fn complete_session(&mut self) -> SessionType {
        let next = match self.state.current_session {
            SessionType::Work => {
                self.state.completed_work_sessions =
                    self.state.completed_work_sessions.saturating_add(1);
                self.config.rest_after(self.state.completed_work_sessions)
            }
            SessionType::ShortRest | SessionType::LongRest => SessionType::Work,
        };
        if next == SessionType::LongRest {
            self.state.completed_work_sessions = 0;
        }
        self.state.current_session = next;
        self.state.remaining_seconds = self.config.duration_secs(next);
        next
    }

    fn publish(&mut self) {
        let state = self.state;
        self.observers.notify(&state);
    }
}

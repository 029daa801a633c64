use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::SessionType;

/// Every engine command that changes something produces an Event.
/// Observers get the raw state; the CLI and logs consume these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        session: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// Countdown ran out and the engine moved on by itself.
    SessionCompleted {
        from: SessionType,
        to: SessionType,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
    SessionSkipped {
        from: SessionType,
        to: SessionType,
        completed_work_sessions: u32,
        /// Whether the next session started counting immediately.
        resumed: bool,
        at: DateTime<Utc>,
    },
    DurationChanged {
        session: SessionType,
        minutes: u32,
        /// True when the active countdown was retimed to the new duration.
        rebased: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        session: SessionType,
        remaining_secs: u64,
        total_secs: u64,
        is_running: bool,
        completed_work_sessions: u32,
        display: String,
        at: DateTime<Utc>,
    },
}

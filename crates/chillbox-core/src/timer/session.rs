use serde::{Deserialize, Serialize};

/// The three kinds of countdown phase the engine rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortRest,
    LongRest,
}

impl SessionType {
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Work => "Work",
            SessionType::ShortRest => "Short Rest",
            SessionType::LongRest => "Long Rest",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// What `skip()` does once it has moved to the next session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipBehavior {
    /// Land in the next session paused.
    #[default]
    Pause,
    /// Start counting down the next session right away.
    AutoResume,
}

/// Session durations in whole minutes.
///
/// Values are taken as-is: the engine does not reject zero or oversized
/// durations, callers are expected to clamp them (see
/// [`crate::storage::Config::validate`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub work_minutes: u32,
    pub short_rest_minutes: u32,
    pub long_rest_minutes: u32,
    /// Every n-th completed work session is followed by a long rest.
    /// Zero disables long rests entirely.
    pub sessions_before_long_rest: u32,
}

pub const DEFAULT_WORK_MINUTES: u32 = 20;
pub const DEFAULT_SHORT_REST_MINUTES: u32 = 5;
pub const DEFAULT_LONG_REST_MINUTES: u32 = 30;
pub const DEFAULT_SESSIONS_BEFORE_LONG_REST: u32 = 5;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            short_rest_minutes: DEFAULT_SHORT_REST_MINUTES,
            long_rest_minutes: DEFAULT_LONG_REST_MINUTES,
            sessions_before_long_rest: DEFAULT_SESSIONS_BEFORE_LONG_REST,
        }
    }
}

impl EngineConfig {
    pub fn duration_minutes(&self, session: SessionType) -> u32 {
        match session {
            SessionType::Work => self.work_minutes,
            SessionType::ShortRest => self.short_rest_minutes,
            SessionType::LongRest => self.long_rest_minutes,
        }
    }

    /// Session duration in seconds. Saturates instead of overflowing.
    pub fn duration_secs(&self, session: SessionType) -> u64 {
        u64::from(self.duration_minutes(session)).saturating_mul(60)
    }

    pub(crate) fn set_minutes(&mut self, session: SessionType, minutes: u32) {
        match session {
            SessionType::Work => self.work_minutes = minutes,
            SessionType::ShortRest => self.short_rest_minutes = minutes,
            SessionType::LongRest => self.long_rest_minutes = minutes,
        }
    }

    /// Session that follows a work session, given the already-incremented
    /// count of completed work sessions.
    pub fn rest_after(&self, completed_work_sessions: u32) -> SessionType {
        match completed_work_sessions.checked_rem(self.sessions_before_long_rest) {
            Some(0) => SessionType::LongRest,
            _ => SessionType::ShortRest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_sliders() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.work_minutes, 20);
        assert_eq!(cfg.short_rest_minutes, 5);
        assert_eq!(cfg.long_rest_minutes, 30);
        assert_eq!(cfg.duration_secs(SessionType::Work), 1200);
    }

    #[test]
    fn every_fifth_work_session_earns_long_rest() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rest_after(1), SessionType::ShortRest);
        assert_eq!(cfg.rest_after(4), SessionType::ShortRest);
        assert_eq!(cfg.rest_after(5), SessionType::LongRest);
        assert_eq!(cfg.rest_after(10), SessionType::LongRest);
    }

    #[test]
    fn zero_interval_disables_long_rest() {
        let cfg = EngineConfig {
            sessions_before_long_rest: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.rest_after(5), SessionType::ShortRest);
        assert_eq!(cfg.rest_after(0), SessionType::ShortRest);
    }

    #[test]
    fn duration_secs_widens_before_multiplying() {
        let cfg = EngineConfig {
            work_minutes: u32::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.duration_secs(SessionType::Work), u64::from(u32::MAX) * 60);
    }

    #[test]
    fn session_type_serializes_snake_case() {
        let json = serde_json::to_string(&SessionType::ShortRest).unwrap();
        assert_eq!(json, "\"short_rest\"");
        let skip: SkipBehavior = serde_json::from_str("\"auto_resume\"").unwrap();
        assert_eq!(skip, SkipBehavior::AutoResume);
    }
}

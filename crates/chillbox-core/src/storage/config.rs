//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Pomodoro session lengths and the long-rest interval
//! - What skipping a session does
//! - Log verbosity
//!
//! Configuration is stored at `~/.config/chillbox/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{data_dir, data_dir_path};
use crate::error::{ConfigError, Result};
use crate::timer::{
    EngineConfig, PomodoroEngine, SkipBehavior, DEFAULT_LONG_REST_MINUTES,
    DEFAULT_SESSIONS_BEFORE_LONG_REST, DEFAULT_SHORT_REST_MINUTES, DEFAULT_WORK_MINUTES,
};

/// Shortest session the duration sliders allow.
pub const MIN_SESSION_MINUTES: u32 = 1;
/// Longest session the duration sliders allow.
pub const MAX_SESSION_MINUTES: u32 = 60;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Pomodoro session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: u32,
    #[serde(default = "default_short_rest_minutes")]
    pub short_rest_minutes: u32,
    #[serde(default = "default_long_rest_minutes")]
    pub long_rest_minutes: u32,
    #[serde(default = "default_sessions_before_long_rest")]
    pub sessions_before_long_rest: u32,
    #[serde(default)]
    pub skip_behavior: SkipBehavior,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/chillbox/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pomodoro: PomodoroConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_work_minutes() -> u32 {
    DEFAULT_WORK_MINUTES
}
fn default_short_rest_minutes() -> u32 {
    DEFAULT_SHORT_REST_MINUTES
}
fn default_long_rest_minutes() -> u32 {
    DEFAULT_LONG_REST_MINUTES
}
fn default_sessions_before_long_rest() -> u32 {
    DEFAULT_SESSIONS_BEFORE_LONG_REST
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for PomodoroConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            short_rest_minutes: default_short_rest_minutes(),
            long_rest_minutes: default_long_rest_minutes(),
            sessions_before_long_rest: default_sessions_before_long_rest(),
            skip_behavior: SkipBehavior::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> std::result::Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(e.to_string()))?,
                serde_json::Value::Number(_) => value
                    .parse::<u64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    return Err(invalid("cannot assign to a whole section".into()));
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults there on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds out-of-range values, or if the default config cannot be saved.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            Ok(cfg)
        }
    }

    /// Load the config only if one has been saved. Never writes.
    pub fn load_existing() -> Result<Option<Self>> {
        let path = data_dir_path().join("config.toml");
        if path.exists() {
            Self::load_from(&path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load and validate a config file at an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The change is validated but
    /// not saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or falls outside the allowed range. `self` is untouched on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check session lengths against the slider range and the log level
    /// against the known filters.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let durations = [
            ("pomodoro.work_minutes", self.pomodoro.work_minutes),
            ("pomodoro.short_rest_minutes", self.pomodoro.short_rest_minutes),
            ("pomodoro.long_rest_minutes", self.pomodoro.long_rest_minutes),
        ];
        for (key, minutes) in durations {
            if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!(
                        "{minutes} is outside {MIN_SESSION_MINUTES}..={MAX_SESSION_MINUTES} minutes"
                    ),
                });
            }
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".into(),
                message: format!("expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            work_minutes: self.pomodoro.work_minutes,
            short_rest_minutes: self.pomodoro.short_rest_minutes,
            long_rest_minutes: self.pomodoro.long_rest_minutes,
            sessions_before_long_rest: self.pomodoro.sessions_before_long_rest,
        }
    }

    pub fn skip_behavior(&self) -> SkipBehavior {
        self.pomodoro.skip_behavior
    }

    /// Fresh engine built from these settings.
    pub fn engine(&self) -> PomodoroEngine {
        PomodoroEngine::new(self.engine_config()).with_skip_behavior(self.skip_behavior())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::timer::SessionType;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.pomodoro.work_minutes, 20);
        assert_eq!(cfg.pomodoro.short_rest_minutes, 5);
        assert_eq!(cfg.pomodoro.long_rest_minutes, 30);
        assert_eq!(cfg.pomodoro.sessions_before_long_rest, 5);
        assert_eq!(cfg.pomodoro.skip_behavior, SkipBehavior::Pause);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: Config = toml::from_str("[pomodoro]\nwork_minutes = 45\n").unwrap();
        assert_eq!(cfg.pomodoro.work_minutes, 45);
        assert_eq!(cfg.pomodoro.long_rest_minutes, 30);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("pomodoro.work_minutes").as_deref(), Some("20"));
        assert_eq!(cfg.get("pomodoro.skip_behavior").as_deref(), Some("pause"));
        assert_eq!(cfg.get("logging.level").as_deref(), Some("info"));
        assert!(cfg.get("pomodoro.missing_key").is_none());
        assert!(cfg.get("").is_none());
    }

    #[test]
    fn set_updates_numbers_and_enums() {
        let mut cfg = Config::default();
        cfg.set("pomodoro.short_rest_minutes", "10").unwrap();
        cfg.set("pomodoro.skip_behavior", "auto_resume").unwrap();
        assert_eq!(cfg.pomodoro.short_rest_minutes, 10);
        assert_eq!(cfg.skip_behavior(), SkipBehavior::AutoResume);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("pomodoro.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::UnknownKey(_))));
        assert!(cfg.set("pomodoro", "1").is_err());
    }

    #[test]
    fn set_rejects_bad_values_without_mutating() {
        let mut cfg = Config::default();
        assert!(cfg.set("pomodoro.work_minutes", "abc").is_err());
        assert!(cfg.set("pomodoro.work_minutes", "0").is_err());
        assert!(cfg.set("pomodoro.work_minutes", "61").is_err());
        assert!(cfg.set("pomodoro.skip_behavior", "sometimes").is_err());
        assert!(cfg.set("logging.level", "loud").is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn slider_bounds_are_inclusive() {
        let mut cfg = Config::default();
        cfg.set("pomodoro.work_minutes", "1").unwrap();
        cfg.set("pomodoro.long_rest_minutes", "60").unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set("pomodoro.work_minutes", "25").unwrap();
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pomodoro.work_minutes, 25);
    }

    #[test]
    fn load_rejects_out_of_range_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[pomodoro]\nwork_minutes = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load_from(&missing).unwrap_err(),
            CoreError::Config(ConfigError::LoadFailed { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[pomodoro\n").unwrap();
        assert!(matches!(
            Config::load_from(&broken).unwrap_err(),
            CoreError::Config(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn engine_uses_configured_settings() {
        let mut cfg = Config::default();
        cfg.set("pomodoro.work_minutes", "2").unwrap();
        cfg.set("pomodoro.skip_behavior", "auto_resume").unwrap();
        let mut engine = cfg.engine();
        assert_eq!(engine.state().remaining_seconds, 120);
        engine.skip();
        assert_eq!(engine.state().current_session, SessionType::ShortRest);
        assert!(engine.is_running());
    }
}

mod config;

pub use config::{
    Config, LoggingConfig, PomodoroConfig, MAX_SESSION_MINUTES, MIN_SESSION_MINUTES,
};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/chillbox[-dev]/` based on CHILLBOX_ENV, creating it.
///
/// Set CHILLBOX_ENV=dev to use development data directory. CHILLBOX_HOME
/// replaces the whole path when set.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = data_dir_path();
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Same location as [`data_dir`], without touching the filesystem.
pub fn data_dir_path() -> PathBuf {
    if let Some(home) = std::env::var_os("CHILLBOX_HOME") {
        return PathBuf::from(home);
    }
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");
    let env = std::env::var("CHILLBOX_ENV").unwrap_or_else(|_| "production".to_string());
    if env == "dev" {
        base_dir.join("chillbox-dev")
    } else {
        base_dir.join("chillbox")
    }
}

//! # ChillBox Core Library
//!
//! Business logic behind the ChillBox Pomodoro screen. Rendering, audio and
//! navigation live in the front-ends; this crate only owns the countdown.
//!
//! ## Architecture
//!
//! - **Pomodoro Engine**: a tick-driven session state machine that rotates
//!   Work, Short Rest and Long Rest and publishes its state to observers
//! - **Timer Driver**: a tokio task that owns one engine and feeds it a
//!   drift-free one-second tick
//! - **Config**: TOML-based defaults for session lengths and logging
//!
//! ## Key Components
//!
//! - [`PomodoroEngine`]: Core session state machine
//! - [`PomodoroTimer`]: Async handle driving an engine in real time
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod format;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, TimerError};
pub use events::Event;
pub use format::format_time;
pub use storage::Config;
pub use timer::{
    EngineConfig, EngineState, ObserverId, PomodoroEngine, PomodoroTimer, SessionType,
    SkipBehavior, StateObserver,
};

mod driver;
mod engine;
mod observer;
mod session;

pub use driver::{PomodoroTimer, TICK_PERIOD};
pub use engine::{EngineState, PomodoroEngine};
pub use observer::{ObserverId, StateObserver};
pub use session::{
    EngineConfig, SessionType, SkipBehavior, DEFAULT_LONG_REST_MINUTES,
    DEFAULT_SESSIONS_BEFORE_LONG_REST, DEFAULT_SHORT_REST_MINUTES, DEFAULT_WORK_MINUTES,
};

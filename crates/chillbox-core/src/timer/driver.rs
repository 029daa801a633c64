//! Async countdown driver.
//!
//! [`PomodoroTimer`] moves a [`PomodoroEngine`] into a single tokio task and
//! talks to it over a command channel. That task is the only place the engine
//! is mutated, and it keeps at most one tick interval alive: the interval is
//! dropped and rebuilt in-line whenever the running status or the session
//! changes, so two countdowns can never race.
//!
//! Ticks are scheduled from a fixed origin (`interval_at`), not by sleeping a
//! second after each tick, so the countdown does not drift against the wall
//! clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use super::engine::{EngineState, PomodoroEngine};
use super::observer::{ObserverId, StateObserver};
use super::session::{SessionType, SkipBehavior};
use crate::error::TimerError;
use crate::events::Event;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const EVENT_BUFFER: usize = 64;

enum Command {
    Start,
    Pause,
    Reset,
    Skip,
    SetMinutes(SessionType, u32),
    SetSkipBehavior(SkipBehavior),
    Subscribe(ObserverId, Box<dyn StateObserver>),
    Unsubscribe(ObserverId),
    Snapshot(oneshot::Sender<EngineState>),
    PublishSnapshot,
    Shutdown,
}

/// Handle to a running Pomodoro countdown.
///
/// All commands are non-blocking; they are queued and applied in order by
/// the owning task. Use [`PomodoroTimer::snapshot`] to observe the state
/// after everything sent so far has been applied.
pub struct PomodoroTimer {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<EngineState>,
    events: broadcast::Sender<Event>,
    next_observer: Arc<AtomicU64>,
}

impl PomodoroTimer {
    /// Move `engine` into a new task on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(mut engine: PomodoroEngine) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(engine.state());
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);

        engine.subscribe(move |state: &EngineState| {
            state_tx.send_replace(*state);
        });
        let next_observer = Arc::new(AtomicU64::new(engine.next_observer_id()));

        let driver = Driver {
            engine,
            events: event_tx.clone(),
            ticker: None,
        };
        tokio::spawn(driver.run(command_rx));

        Self {
            commands: command_tx,
            state: state_rx,
            events: event_tx,
            next_observer,
        }
    }

    pub fn start(&self) -> Result<(), TimerError> {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> Result<(), TimerError> {
        self.send(Command::Pause)
    }

    pub fn reset(&self) -> Result<(), TimerError> {
        self.send(Command::Reset)
    }

    pub fn skip(&self) -> Result<(), TimerError> {
        self.send(Command::Skip)
    }

    pub fn set_work_minutes(&self, minutes: u32) -> Result<(), TimerError> {
        self.set_session_minutes(SessionType::Work, minutes)
    }

    pub fn set_short_rest_minutes(&self, minutes: u32) -> Result<(), TimerError> {
        self.set_session_minutes(SessionType::ShortRest, minutes)
    }

    pub fn set_long_rest_minutes(&self, minutes: u32) -> Result<(), TimerError> {
        self.set_session_minutes(SessionType::LongRest, minutes)
    }

    pub fn set_session_minutes(&self, session: SessionType, minutes: u32) -> Result<(), TimerError> {
        self.send(Command::SetMinutes(session, minutes))
    }

    pub fn set_skip_behavior(&self, skip_behavior: SkipBehavior) -> Result<(), TimerError> {
        self.send(Command::SetSkipBehavior(skip_behavior))
    }

    /// Register an observer on the engine. It runs inside the timer task.
    pub fn subscribe<O>(&self, observer: O) -> Result<ObserverId, TimerError>
    where
        O: StateObserver + 'static,
    {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Subscribe(id, Box::new(observer)))?;
        Ok(id)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> Result<(), TimerError> {
        self.send(Command::Unsubscribe(id))
    }

    /// Current state, after every command queued before this call.
    pub async fn snapshot(&self) -> Result<EngineState, TimerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| TimerError::Closed)
    }

    /// Emit an [`Event::StateSnapshot`] on the event stream, ordered after
    /// every event caused by earlier commands.
    pub fn publish_snapshot(&self) -> Result<(), TimerError> {
        self.send(Command::PublishSnapshot)
    }

    /// Latest published state as a watch stream.
    pub fn watch(&self) -> watch::Receiver<EngineState> {
        self.state.clone()
    }

    /// Every event the engine emits from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Stop the timer task and wait until it has exited.
    pub async fn shutdown(&self) {
        if self.commands.send(Command::Shutdown).is_ok() {
            self.commands.closed().await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), TimerError> {
        self.commands.send(command).map_err(|_| TimerError::Closed)
    }
}

enum Step {
    Command(Option<Command>),
    Tick(Instant),
}

struct Driver {
    engine: PomodoroEngine,
    events: broadcast::Sender<Event>,
    /// The one outstanding countdown, if running.
    ticker: Option<Interval>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let step = tokio::select! {
                biased;
                command = commands.recv() => Step::Command(command),
                at = next_tick(&mut self.ticker) => Step::Tick(at),
            };
            match step {
                Step::Command(None) | Step::Command(Some(Command::Shutdown)) => break,
                Step::Command(Some(command)) => self.handle(command),
                Step::Tick(at) => self.on_tick(at),
            }
        }
        self.ticker = None;
        debug!("pomodoro timer task stopped");
    }

    fn handle(&mut self, command: Command) {
        let event = match command {
            Command::Start => self.rearm_after(|engine| engine.start()),
            Command::Pause => self.rearm_after(|engine| engine.pause()),
            Command::Reset => self.rearm_after(|engine| engine.reset()),
            Command::Skip => self.rearm_after(|engine| engine.skip()),
            Command::SetMinutes(session, minutes) => {
                self.engine.set_session_minutes(session, minutes)
            }
            Command::SetSkipBehavior(skip_behavior) => {
                self.engine.set_skip_behavior(skip_behavior);
                None
            }
            Command::Subscribe(id, observer) => {
                self.engine.subscribe_with_id(id, observer);
                None
            }
            Command::Unsubscribe(id) => {
                self.engine.unsubscribe(id);
                None
            }
            Command::Snapshot(reply) => {
                // Receiver may have given up waiting.
                let _ = reply.send(self.engine.state());
                None
            }
            Command::PublishSnapshot => Some(self.engine.snapshot()),
            Command::Shutdown => None,
        };
        self.emit(event);
    }

    fn on_tick(&mut self, at: Instant) {
        trace!(remaining = self.engine.state().remaining_seconds, "tick");
        let event = self.engine.tick();
        if event.is_some() {
            // Next session counts from this tick's slot, not from "now".
            self.arm(at);
        }
        self.emit(event);
    }

    /// Run a command and, if it changed anything, replace the ticker.
    fn rearm_after<F>(&mut self, command: F) -> Option<Event>
    where
        F: FnOnce(&mut PomodoroEngine) -> Option<Event>,
    {
        let event = command(&mut self.engine);
        if event.is_some() {
            self.arm(Instant::now());
        }
        event
    }

    fn arm(&mut self, origin: Instant) {
        self.ticker = None;
        if self.engine.is_running() {
            let mut interval = interval_at(origin + TICK_PERIOD, TICK_PERIOD);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            self.ticker = Some(interval);
        }
    }

    fn emit(&self, event: Option<Event>) {
        if let Some(event) = event {
            debug!(?event, "timer event");
            // No receivers is fine.
            let _ = self.events.send(event);
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) -> Instant {
    match ticker {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::EngineConfig;
    use std::sync::Mutex;

    fn one_minute_engine() -> PomodoroEngine {
        PomodoroEngine::new(EngineConfig {
            work_minutes: 1,
            short_rest_minutes: 1,
            long_rest_minutes: 1,
            ..EngineConfig::default()
        })
    }

    async fn wait(millis: u64) {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn one_minute_work_rolls_into_short_rest() {
        let timer = PomodoroTimer::spawn(one_minute_engine());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        timer
            .subscribe(move |state: &EngineState| sink.lock().unwrap().push(*state))
            .unwrap();

        timer.start().unwrap();
        wait(60_500).await;

        let expected = EngineState {
            current_session: SessionType::ShortRest,
            remaining_seconds: 60,
            is_running: true,
            completed_work_sessions: 1,
        };
        assert_eq!(timer.snapshot().await.unwrap(), expected);
        assert_eq!(*seen.lock().unwrap().last().unwrap(), expected);
        // start + 59 plain ticks + the transition
        assert_eq!(seen.lock().unwrap().len(), 61);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_and_start_resumes() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        wait(10_500).await;
        timer.pause().unwrap();
        let paused = timer.snapshot().await.unwrap();
        assert_eq!(paused.remaining_seconds, 1190);
        assert!(!paused.is_running);

        wait(30_000).await;
        assert_eq!(timer.snapshot().await.unwrap(), paused);

        timer.start().unwrap();
        wait(1_500).await;
        assert_eq!(timer.snapshot().await.unwrap().remaining_seconds, 1189);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_commands_never_double_tick() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        timer.start().unwrap();
        timer.pause().unwrap();
        timer.start().unwrap();
        timer.start().unwrap();
        wait(5_500).await;
        assert_eq!(timer.snapshot().await.unwrap().remaining_seconds, 1195);
    }

    #[tokio::test(start_paused = true)]
    async fn long_runs_do_not_drift() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        wait(1_000_500).await;
        let state = timer.snapshot().await.unwrap();
        assert_eq!(state.current_session, SessionType::Work);
        assert_eq!(state.remaining_seconds, 200);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_stops_the_countdown() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        wait(5_500).await;
        timer.reset().unwrap();
        wait(5_000).await;
        assert_eq!(timer.snapshot().await.unwrap(), EngineState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn skip_parks_the_next_session() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        wait(3_500).await;
        timer.skip().unwrap();
        wait(10_000).await;
        let state = timer.snapshot().await.unwrap();
        assert_eq!(state.current_session, SessionType::ShortRest);
        assert_eq!(state.remaining_seconds, 300);
        assert!(!state.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_resume_skip_keeps_ticking() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.set_skip_behavior(SkipBehavior::AutoResume).unwrap();
        timer.skip().unwrap();
        wait(2_500).await;
        let state = timer.snapshot().await.unwrap();
        assert!(state.is_running);
        assert_eq!(state.remaining_seconds, 298);
    }

    #[tokio::test(start_paused = true)]
    async fn rebase_while_running_keeps_running() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.start().unwrap();
        wait(2_500).await;
        timer.set_work_minutes(5).unwrap();
        let state = timer.snapshot().await.unwrap();
        assert_eq!(state.remaining_seconds, 300);
        assert!(state.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn watch_and_events_follow_commands() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        let mut watch = timer.watch();
        let mut events = timer.events();
        assert!(!watch.borrow().is_running);

        timer.start().unwrap();
        watch.changed().await.unwrap();
        assert!(watch.borrow_and_update().is_running);
        assert!(matches!(
            events.recv().await.unwrap(),
            Event::TimerStarted {
                session: SessionType::Work,
                remaining_secs: 1200,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribed_observer_goes_quiet() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        let count = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&count);
        let id = timer
            .subscribe(move |_: &EngineState| *sink.lock().unwrap() += 1)
            .unwrap();
        timer.start().unwrap();
        timer.unsubscribe(id).unwrap();
        wait(3_500).await;
        timer.snapshot().await.unwrap();
        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_skip_once() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        timer
            .subscribe(move |state: &EngineState| sink.lock().unwrap().push(*state))
            .unwrap();

        timer.skip().unwrap();
        timer.snapshot().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![EngineState {
                current_session: SessionType::ShortRest,
                remaining_seconds: 300,
                is_running: false,
                completed_work_sessions: 1,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn published_snapshot_follows_earlier_events() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        let mut events = timer.events();
        timer.skip().unwrap();
        timer.publish_snapshot().unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            Event::SessionSkipped {
                to: SessionType::ShortRest,
                completed_work_sessions: 1,
                resumed: false,
                ..
            }
        ));
        match events.recv().await.unwrap() {
            Event::StateSnapshot {
                session,
                remaining_secs,
                is_running,
                ..
            } => {
                assert_eq!(session, SessionType::ShortRest);
                assert_eq!(remaining_secs, 300);
                assert!(!is_running);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let timer = PomodoroTimer::spawn(PomodoroEngine::default());
        timer.shutdown().await;
        assert!(timer.is_closed());
        assert!(matches!(timer.start(), Err(TimerError::Closed)));
        assert!(matches!(timer.snapshot().await, Err(TimerError::Closed)));
    }
}

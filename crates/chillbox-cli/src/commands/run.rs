use clap::Args;
use chillbox_core::storage::{MAX_SESSION_MINUTES, MIN_SESSION_MINUTES};
use chillbox_core::{Config, EngineState, PomodoroTimer, SessionType, SkipBehavior};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

const HELP: &str =
    "commands: s=start p=pause r=reset k=skip w|sr|lr <minutes> ?=status q=quit";

#[derive(Args)]
pub struct RunArgs {
    /// Work session length in minutes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    work: Option<u32>,
    /// Short rest length in minutes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    short_rest: Option<u32>,
    /// Long rest length in minutes
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    long_rest: Option<u32>,
    /// Keep counting after a skip instead of pausing
    #[arg(long)]
    auto_resume_skip: bool,
    /// Print engine events as JSON instead of the clock face
    #[arg(long)]
    json: bool,
    /// Wait for `s` before counting down
    #[arg(long)]
    no_autostart: bool,
}

/// One line typed on stdin.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Start,
    Pause,
    Reset,
    Skip,
    SetMinutes(SessionType, u32),
    Status,
    Quit,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Input::Status);
    };
    let session = match head {
        "s" | "start" => return Ok(Input::Start),
        "p" | "pause" => return Ok(Input::Pause),
        "r" | "reset" => return Ok(Input::Reset),
        "k" | "skip" => return Ok(Input::Skip),
        "?" | "status" => return Ok(Input::Status),
        "q" | "quit" => return Ok(Input::Quit),
        "w" | "work" => SessionType::Work,
        "sr" | "short" => SessionType::ShortRest,
        "lr" | "long" => SessionType::LongRest,
        other => return Err(format!("unknown command '{other}'; {HELP}")),
    };
    let minutes: u32 = words
        .next()
        .ok_or_else(|| format!("'{head}' needs a number of minutes"))?
        .parse()
        .map_err(|_| format!("'{head}' needs a whole number of minutes"))?;
    if !(MIN_SESSION_MINUTES..=MAX_SESSION_MINUTES).contains(&minutes) {
        return Err(format!(
            "minutes must be between {MIN_SESSION_MINUTES} and {MAX_SESSION_MINUTES}"
        ));
    }
    Ok(Input::SetMinutes(session, minutes))
}

fn render(state: &EngineState) -> String {
    format!(
        "{} {} [{}] ({} done)",
        state.current_session,
        state.display(),
        if state.is_running { "running" } else { "paused" },
        state.completed_work_sessions
    )
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(args))
}

async fn session(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(minutes) = args.work {
        config.pomodoro.work_minutes = minutes;
    }
    if let Some(minutes) = args.short_rest {
        config.pomodoro.short_rest_minutes = minutes;
    }
    if let Some(minutes) = args.long_rest {
        config.pomodoro.long_rest_minutes = minutes;
    }
    if args.auto_resume_skip {
        config.pomodoro.skip_behavior = SkipBehavior::AutoResume;
    }
    config.validate()?;

    let timer = PomodoroTimer::spawn(config.engine());
    info!(
        work = config.pomodoro.work_minutes,
        short_rest = config.pomodoro.short_rest_minutes,
        long_rest = config.pomodoro.long_rest_minutes,
        "pomodoro session opened"
    );

    let mut printer = None;
    if args.json {
        let mut events = timer.events();
        printer = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!("could not encode event: {e}"),
                    },
                    Err(RecvError::Lagged(missed)) => warn!(missed, "event printer fell behind"),
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    } else {
        timer.subscribe(|state: &EngineState| println!("{}", render(state)))?;
    }

    eprintln!("{HELP}");
    if !args.no_autostart {
        timer.start()?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        match input {
            Input::Start => timer.start()?,
            Input::Pause => timer.pause()?,
            Input::Reset => timer.reset()?,
            Input::Skip => timer.skip()?,
            Input::SetMinutes(session, minutes) => timer.set_session_minutes(session, minutes)?,
            // In JSON mode the printer task owns stdout, so status goes
            // through the event stream to keep its place in line.
            Input::Status if args.json => timer.publish_snapshot()?,
            Input::Status => {
                let state = timer.snapshot().await?;
                println!("{}", render(&state));
            }
            Input::Quit => break,
        }
    }

    timer.shutdown().await;
    // Last event sender goes with the handle; the printer then drains and exits.
    drop(timer);
    if let Some(printer) = printer {
        printer.await?;
    }
    info!("pomodoro session closed");
    Ok(())
}

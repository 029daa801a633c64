use chillbox_core::Config;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. RUST_LOG wins over `logging.level`.
///
/// Only reads an existing config file; commands that need one create it.
pub fn init() {
    let mut config_problem = None;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match Config::load_existing() {
            Ok(Some(cfg)) => cfg.logging.level,
            Ok(None) => Config::default().logging.level,
            Err(e) => {
                config_problem = Some(e);
                "warn".to_string()
            }
        };
        EnvFilter::new(format!("warn,chillbox_core={level},chillbox={level}"))
    });

    // Ignore a second init (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Some(e) = config_problem {
        tracing::warn!("ignoring logging settings: {e}");
    }
}

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. `RUST_LOG` wins when set; otherwise
/// the verbosity count picks the level (0 warn, 1 info, 2+ debug).
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wakefleet={level},wakefleet_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

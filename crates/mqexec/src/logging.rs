//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `RUST_LOG` environment variable
//! 2. `--log-level` CLI flag
//! 3. `--debug` (debug for this agent's own crates, info elsewhere)
//! 4. default to `info`

use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

use crate::cli::LogLevel;

/// Initialise the global subscriber, writing to stderr.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(level: Option<LogLevel>, debug: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level, debug)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .try_init()
}

fn default_directive(level: Option<LogLevel>, debug: bool) -> String {
    match (level, debug) {
        (Some(level), _) => level.as_str().to_string(),
        (None, true) => "info,mqexec=debug".to_string(),
        (None, false) => "info".to_string(),
    }
}

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the level passed by the caller
//! 2. `JOBEXEC_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs go to STDERR.

use tracing::Level;
use tracing_subscriber::fmt;

pub const LOG_ENV_VAR: &str = "JOBEXEC_LOG";

/// Install the global subscriber. Returns an error if one is already installed.
pub fn init_logging(level: Option<Level>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = level.unwrap_or_else(|| {
        std::env::var(LOG_ENV_VAR)
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(Level::INFO)
    });

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
}

/// Subscriber for tests: output is captured per test and repeated calls are ignored.
pub fn init_test_logging() {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|s| parse_level_str(&s))
        .unwrap_or(Level::DEBUG);
    let _ = fmt().with_max_level(level).with_test_writer().try_init();
}

pub fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

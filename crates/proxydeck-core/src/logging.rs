//! Logging configuration using tracing
//!
//! Output goes to a daily-rolling file so that stdout and stderr stay free
//! for the front end.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Environment variable that overrides the log filter.
pub const LOG_ENV_VAR: &str = "PROXYDECK_LOG";

const DEFAULT_FILTER: &str = "proxydeck=info,warn";
const LOG_FILE_PREFIX: &str = "proxydeck.log";

/// Initialize the logging subsystem
///
/// Logs are written under [`log_directory`], one file per day. The filter
/// comes from `PROXYDECK_LOG` and falls back to `proxydeck=info,warn`.
///
/// # Examples
/// ```bash
/// PROXYDECK_LOG=debug proxydeck watch
/// PROXYDECK_LOG=proxydeck_app=trace proxydeck toggle
/// ```
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!(
        "proxydeck {} starting, logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_dir.display()
    );

    Ok(())
}

/// `<platform data dir>/proxydeck/logs`, or `./proxydeck/logs` when the
/// platform reports no data directory
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proxydeck")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_namespaced() {
        assert!(log_directory().ends_with("proxydeck/logs"));
    }
}

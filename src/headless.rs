//! NDJSON output for the headless launcher
//!
//! Every line on stdout is one JSON object tagged with `event`. Logs go to the
//! log file and notifications to stderr, so stdout stays machine-readable.

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;
use tracing::error;

use proxydeck_app::EngineEvent;
use proxydeck_core::{CommandOutcome, StatusView};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HeadlessEvent {
    /// Connected to the backend bridge
    Connected { url: String, timestamp: i64 },

    /// Latest known process status
    Status { status: StatusView, timestamp: i64 },

    /// A subcommand finished
    CommandCompleted {
        command: String,
        success: bool,
        message: String,
        timestamp: i64,
    },

    SectionSaved { section: String, timestamp: i64 },

    CertificateInstalled { timestamp: i64 },

    Reloaded { success: bool, timestamp: i64 },

    /// Default config.toml written (or already present)
    ConfigInitialized { path: String, timestamp: i64 },

    Error {
        message: String,
        fatal: bool,
        timestamp: i64,
    },

    Shutdown { timestamp: i64 },
}

impl HeadlessEvent {
    /// Emit this event to stdout as a single JSON line
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize headless event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write headless event to stdout: {}", e);
            return;
        }

        if let Err(e) = stdout.flush() {
            error!("Failed to flush headless stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn connected(url: &str) -> Self {
        Self::Connected {
            url: url.to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn status(status: StatusView) -> Self {
        Self::Status {
            status,
            timestamp: Self::now(),
        }
    }

    pub fn command_completed(command: &str, outcome: &CommandOutcome) -> Self {
        Self::CommandCompleted {
            command: command.to_string(),
            success: outcome.success,
            message: outcome.message.clone(),
            timestamp: Self::now(),
        }
    }

    pub fn config_initialized(path: &std::path::Path) -> Self {
        Self::ConfigInitialized {
            path: path.display().to_string(),
            timestamp: Self::now(),
        }
    }

    pub fn error(message: impl Into<String>, fatal: bool) -> Self {
        Self::Error {
            message: message.into(),
            fatal,
            timestamp: Self::now(),
        }
    }

    pub fn shutdown() -> Self {
        Self::Shutdown {
            timestamp: Self::now(),
        }
    }
}

impl From<EngineEvent> for HeadlessEvent {
    fn from(event: EngineEvent) -> Self {
        let timestamp = Self::now();
        match event {
            EngineEvent::StatusRefreshed { status } => Self::Status { status, timestamp },
            EngineEvent::SectionSaved { section } => Self::SectionSaved {
                section: section.to_string(),
                timestamp,
            },
            EngineEvent::CertificateInstalled => Self::CertificateInstalled { timestamp },
            EngineEvent::Reloaded { success } => Self::Reloaded { success, timestamp },
            EngineEvent::Shutdown => Self::Shutdown { timestamp },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_value(event: &HeadlessEvent) -> serde_json::Value {
        serde_json::to_value(event).unwrap()
    }

    #[test]
    fn test_command_completed_shape() {
        let outcome = CommandOutcome::failure("Failed to stop proxy: Backend unreachable: refused");
        let value = to_value(&HeadlessEvent::command_completed("stop", &outcome));

        assert_eq!(value["event"], "command_completed");
        assert_eq!(value["command"], "stop");
        assert_eq!(value["success"], false);
        assert!(value["message"].as_str().unwrap().starts_with("Failed to stop"));
        assert!(value["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_status_carries_view() {
        let value = to_value(&HeadlessEvent::status(StatusView::default()));

        assert_eq!(value["event"], "status");
        assert_eq!(value["status"]["port"], 8080);
        assert_eq!(value["status"]["uptime"], "00:00:00");
        assert_eq!(value["status"]["mode"], "http");
    }

    #[test]
    fn test_from_engine_event() {
        let event: HeadlessEvent = EngineEvent::SectionSaved { section: "theme" }.into();
        let value = to_value(&event);
        assert_eq!(value["event"], "section_saved");
        assert_eq!(value["section"], "theme");

        let event: HeadlessEvent = EngineEvent::Reloaded { success: true }.into();
        assert_eq!(to_value(&event)["event"], "reloaded");
    }
}

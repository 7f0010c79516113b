//! User-facing notifications

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Display time used when the producer does not ask for one.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

static NOTIFICATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_notification_id() -> u64 {
    NOTIFICATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Success => "SUCCESS",
            Severity::Error => "ERROR",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A transient message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub title: String,
    pub body: String,
    #[serde(rename = "duration_ms", serialize_with = "duration_as_millis")]
    pub duration: Duration,
}

fn duration_as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl Notification {
    pub fn new(
        severity: Severity,
        title: impl Into<String>,
        body: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: next_notification_id(),
            severity,
            title: title.into(),
            body: body.into(),
            duration,
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.title, self.body)
    }
}

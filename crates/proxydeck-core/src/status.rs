//! Proxy process status as reported by the backend, and its displayable view

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Port shown before the first successful status refresh.
pub const INITIAL_VIEW_PORT: u16 = 8080;

/// Proxy operating mode
///
/// The backend may grow modes this client does not know about; those
/// deserialize as [`ProxyMode::Unknown`] instead of failing the whole status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    #[default]
    Http,
    Socks,
    Host,
    #[serde(other)]
    Unknown,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Http => "http",
            ProxyMode::Socks => "socks",
            ProxyMode::Host => "host",
            ProxyMode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProxyMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyMode::Http),
            "socks" => Ok(ProxyMode::Socks),
            "host" => Ok(ProxyMode::Host),
            other => Err(crate::Error::config_invalid(format!(
                "unknown proxy mode '{other}' (expected http, socks or host)"
            ))),
        }
    }
}

/// Process status snapshot, owned by the backend
///
/// Replaced wholesale on every successful refresh; the client never edits it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStatus {
    pub is_running: bool,

    /// Epoch seconds; the backend sends `0` when the process is not running
    #[serde(rename = "startTime", default, with = "epoch_or_zero")]
    pub started_at_epoch_seconds: Option<i64>,

    #[serde(rename = "uptime", default)]
    pub uptime_seconds: u64,

    #[serde(rename = "port", default)]
    pub listen_port: u16,

    #[serde(default)]
    pub active_connections: u64,

    #[serde(default)]
    pub total_requests: u64,

    #[serde(default)]
    pub mode: ProxyMode,
}

mod epoch_or_zero {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(value.unwrap_or(0))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let raw = Option::<i64>::deserialize(d)?;
        Ok(raw.filter(|secs| *secs > 0))
    }
}

/// Format an uptime in seconds as `HH:MM:SS`
///
/// The hour field is not capped; 100 hours and beyond simply widens it.
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Displayable projection of the last known [`ProcessStatus`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    pub is_running: bool,
    pub started_at: Option<DateTime<Local>>,
    pub uptime: String,
    pub port: u16,
    pub active_connections: u64,
    pub total_requests: u64,
    pub mode: ProxyMode,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            is_running: false,
            started_at: None,
            uptime: format_uptime(0),
            port: INITIAL_VIEW_PORT,
            active_connections: 0,
            total_requests: 0,
            mode: ProxyMode::Http,
        }
    }
}

impl From<&ProcessStatus> for StatusView {
    fn from(status: &ProcessStatus) -> Self {
        // Uptime is shown as reported even when `is_running` is false: the
        // backend can lag by one refresh while stopping.
        Self {
            is_running: status.is_running,
            started_at: status
                .started_at_epoch_seconds
                .and_then(|secs| Local.timestamp_opt(secs, 0).single()),
            uptime: format_uptime(status.uptime_seconds),
            port: status.listen_port,
            active_connections: status.active_connections,
            total_requests: status.total_requests,
            mode: status.mode,
        }
    }
}

//! Client settings types
//!
//! These describe how this client behaves (poll cadence, notification
//! timing, where the backend lives). They are unrelated to the backend-owned
//! configuration document.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll intervals below this are raised to it
pub const MIN_POLL_INTERVAL_MS: u64 = 500;

/// Request timeouts below this are raised to it
pub const MIN_REQUEST_TIMEOUT_MS: u64 = 1000;

/// Global client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub monitor: MonitorSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub backend: BackendSettings,
}

/// Status polling
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MonitorSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }
}

/// Notification delivery
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NotificationSettings {
    /// How long a notification waits for a display to attach
    #[serde(default = "default_retry_window_ms")]
    pub retry_window_ms: u64,

    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            retry_window_ms: default_retry_window_ms(),
            default_duration_ms: default_duration_ms(),
        }
    }
}

impl NotificationSettings {
    pub fn retry_window(&self) -> Duration {
        Duration::from_millis(self.retry_window_ms)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::from_millis(self.default_duration_ms)
    }
}

/// Where and how to reach the backend bridge
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(MIN_REQUEST_TIMEOUT_MS))
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_retry_window_ms() -> u64 {
    100
}

fn default_duration_ms() -> u64 {
    3000
}

fn default_backend_url() -> String {
    "ws://127.0.0.1:34115/rpc".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.monitor.poll_interval(), Duration::from_secs(3));
        assert_eq!(
            settings.notifications.retry_window(),
            Duration::from_millis(100)
        );
        assert_eq!(
            settings.notifications.default_duration(),
            proxydeck_core::DEFAULT_NOTIFICATION_DURATION
        );
        assert_eq!(settings.backend.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_clamps() {
        let monitor = MonitorSettings {
            poll_interval_ms: 10,
        };
        assert_eq!(monitor.poll_interval(), Duration::from_millis(500));

        let backend = BackendSettings {
            request_timeout_ms: 0,
            ..BackendSettings::default()
        };
        assert_eq!(backend.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let settings: Settings = toml::from_str("[notifications]\nretry_window_ms = 250\n").unwrap();
        assert_eq!(settings.notifications.retry_window_ms, 250);
        assert_eq!(settings.notifications.default_duration_ms, 3000);
        assert_eq!(settings.monitor, MonitorSettings::default());
    }
}

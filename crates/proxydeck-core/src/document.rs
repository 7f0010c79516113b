//! The shared configuration document owned by the backend
//!
//! The backend stores one document with four logically independent sections
//! (`General`, `UI`, `Proxy`, `Log`) and exchanges it as a single unit. The
//! wire types here keep every field optional so that a read-modify-write never
//! invents values the backend did not send, and they carry any fields or
//! sections this client does not know about through untouched.
//!
//! Editors never read the wire types directly. They use the typed projections
//! ([`ProxyConfig`], [`UiConfig`], [`GeneralConfig`], [`LogConfig`]) which fall
//! back to the constants in [`defaults`] for anything absent or empty.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::status::ProxyMode;

/// Per-section defaults, shared by every editor
pub mod defaults {
    use crate::status::ProxyMode;

    pub const PROXY_MODE: ProxyMode = ProxyMode::Http;
    pub const PROXY_PORT: u16 = 9527;
    pub const PROXY_CERT_INSTALLED: bool = false;

    pub const UI_LANGUAGE: &str = "zh-CN";
    pub const UI_THEME: &str = "light";
    pub const UI_WIDTH: u16 = 1200;
    pub const UI_HEIGHT: u16 = 800;

    pub const GENERAL_AUTO_START: bool = false;
    pub const GENERAL_START_MINIMIZED: bool = false;
    pub const GENERAL_CLOSE_ACTION: &str = "ask";

    pub const LOG_LEVEL: &str = "debug";
    pub const LOG_FILE: bool = true;
    pub const LOG_CONSOLE: bool = true;
}

/// Theme names the UI knows how to render, default first
pub const THEMES: &[&str] = &[
    "light",
    "dark",
    "cupcake",
    "bumblebee",
    "emerald",
    "corporate",
    "synthwave",
    "retro",
    "cyberpunk",
    "valentine",
    "halloween",
    "garden",
    "forest",
    "aqua",
    "lofi",
    "pastel",
    "fantasy",
    "wireframe",
    "black",
    "luxury",
    "dracula",
    "cmyk",
    "autumn",
    "business",
    "acid",
    "lemonade",
    "night",
    "coffee",
    "winter",
    "dim",
    "nord",
    "sunset",
];

pub fn is_known_theme(name: &str) -> bool {
    THEMES.contains(&name)
}

/// Close-button behaviours accepted by the backend
pub const CLOSE_ACTIONS: &[&str] = &["ask", "minimize", "exit"];

pub fn is_known_close_action(action: &str) -> bool {
    CLOSE_ACTIONS.contains(&action)
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// The whole configuration document as exchanged with the backend
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ConfigDocument {
    #[serde(rename = "General", default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralSection>,

    #[serde(rename = "UI", default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiSection>,

    #[serde(rename = "Proxy", default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySection>,

    #[serde(rename = "Log", default, skip_serializing_if = "Option::is_none")]
    pub log: Option<LogSection>,

    /// Sections this client does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ProxySection {
    #[serde(rename = "Mode", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(rename = "Port", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(rename = "CertInstalled", default, skip_serializing_if = "Option::is_none")]
    pub cert_installed: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct UiSection {
    #[serde(rename = "Language", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(rename = "Theme", default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,

    #[serde(rename = "Width", default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u16>,

    #[serde(rename = "Height", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u16>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct GeneralSection {
    #[serde(rename = "AutoStart", default, skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,

    #[serde(rename = "StartMinimized", default, skip_serializing_if = "Option::is_none")]
    pub start_minimized: Option<bool>,

    #[serde(rename = "CloseAction", default, skip_serializing_if = "Option::is_none")]
    pub close_action: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct LogSection {
    #[serde(rename = "Level", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(rename = "File", default, skip_serializing_if = "Option::is_none")]
    pub file: Option<bool>,

    #[serde(rename = "Console", default, skip_serializing_if = "Option::is_none")]
    pub console: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Typed projections
// ─────────────────────────────────────────────────────────────────────────────

/// Proxy settings as edited by the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
    pub port: u16,
    pub cert_installed: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mode: defaults::PROXY_MODE,
            port: defaults::PROXY_PORT,
            cert_installed: defaults::PROXY_CERT_INSTALLED,
        }
    }
}

/// Window and appearance settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiConfig {
    pub language: String,
    pub theme: String,
    pub width: u16,
    pub height: u16,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            language: defaults::UI_LANGUAGE.to_string(),
            theme: defaults::UI_THEME.to_string(),
            width: defaults::UI_WIDTH,
            height: defaults::UI_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneralConfig {
    pub auto_start: bool,
    pub start_minimized: bool,
    pub close_action: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            auto_start: defaults::GENERAL_AUTO_START,
            start_minimized: defaults::GENERAL_START_MINIMIZED,
            close_action: defaults::GENERAL_CLOSE_ACTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    pub level: String,
    pub file: bool,
    pub console: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            file: defaults::LOG_FILE,
            console: defaults::LOG_CONSOLE,
        }
    }
}

/// Empty strings count as absent, like the backend's zero values.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

fn non_zero(value: Option<u16>) -> Option<u16> {
    value.filter(|v| *v != 0)
}

fn parse_mode(raw: Option<&String>) -> ProxyMode {
    match non_empty(raw) {
        None => defaults::PROXY_MODE,
        Some(s) => s.parse().unwrap_or(ProxyMode::Unknown),
    }
}

impl ConfigDocument {
    // ── Proxy ────────────────────────────────────────────────────────────

    pub fn proxy_config(&self) -> ProxyConfig {
        let fallback = ProxyConfig::default();
        match &self.proxy {
            None => fallback,
            Some(section) => ProxyConfig {
                mode: parse_mode(section.mode.as_ref()),
                port: non_zero(section.port).unwrap_or(fallback.port),
                cert_installed: section.cert_installed.unwrap_or(fallback.cert_installed),
            },
        }
    }

    /// Write `config` into the `Proxy` section, field by field
    ///
    /// A mode this client could not parse is left as the backend sent it.
    pub fn set_proxy_config(&mut self, config: &ProxyConfig) {
        let section = self.proxy.get_or_insert_with(ProxySection::default);
        if config.mode != ProxyMode::Unknown {
            section.mode = Some(config.mode.as_str().to_string());
        }
        section.port = Some(config.port);
        section.cert_installed = Some(config.cert_installed);
    }

    // ── UI ───────────────────────────────────────────────────────────────

    pub fn ui_config(&self) -> UiConfig {
        let fallback = UiConfig::default();
        match &self.ui {
            None => fallback,
            Some(section) => UiConfig {
                language: non_empty(section.language.as_ref())
                    .map(str::to_string)
                    .unwrap_or(fallback.language),
                theme: non_empty(section.theme.as_ref())
                    .map(str::to_string)
                    .unwrap_or(fallback.theme),
                width: non_zero(section.width).unwrap_or(fallback.width),
                height: non_zero(section.height).unwrap_or(fallback.height),
            },
        }
    }

    pub fn set_ui_config(&mut self, config: &UiConfig) {
        let section = self.ui.get_or_insert_with(UiSection::default);
        section.language = Some(config.language.clone());
        section.theme = Some(config.theme.clone());
        section.width = Some(config.width);
        section.height = Some(config.height);
    }

    pub fn theme(&self) -> String {
        self.ui_config().theme
    }

    /// Set only `UI.Theme`
    ///
    /// When the `UI` section is missing it is synthesized from the UI defaults
    /// so the backend never receives a half-populated section.
    pub fn set_theme(&mut self, theme: &str) {
        match self.ui.as_mut() {
            Some(section) => section.theme = Some(theme.to_string()),
            None => {
                let config = UiConfig {
                    theme: theme.to_string(),
                    ..UiConfig::default()
                };
                self.set_ui_config(&config);
            }
        }
    }

    // ── General ──────────────────────────────────────────────────────────

    pub fn general_config(&self) -> GeneralConfig {
        let fallback = GeneralConfig::default();
        match &self.general {
            None => fallback,
            Some(section) => GeneralConfig {
                auto_start: section.auto_start.unwrap_or(fallback.auto_start),
                start_minimized: section.start_minimized.unwrap_or(fallback.start_minimized),
                close_action: non_empty(section.close_action.as_ref())
                    .map(str::to_string)
                    .unwrap_or(fallback.close_action),
            },
        }
    }

    pub fn set_general_config(&mut self, config: &GeneralConfig) {
        let section = self.general.get_or_insert_with(GeneralSection::default);
        section.auto_start = Some(config.auto_start);
        section.start_minimized = Some(config.start_minimized);
        section.close_action = Some(config.close_action.clone());
    }

    // ── Log ──────────────────────────────────────────────────────────────

    pub fn log_config(&self) -> LogConfig {
        let fallback = LogConfig::default();
        match &self.log {
            None => fallback,
            Some(section) => LogConfig {
                level: non_empty(section.level.as_ref())
                    .map(str::to_string)
                    .unwrap_or(fallback.level),
                file: section.file.unwrap_or(fallback.file),
                console: section.console.unwrap_or(fallback.console),
            },
        }
    }

    pub fn set_log_config(&mut self, config: &LogConfig) {
        let section = self.log.get_or_insert_with(LogSection::default);
        section.level = Some(config.level.clone());
        section.file = Some(config.file);
        section.console = Some(config.console);
    }
}

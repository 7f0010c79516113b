//! Concrete document sections and their editors

use proxydeck_core::prelude::*;
use proxydeck_core::{
    is_known_close_action, is_known_theme, CommandOutcome, ConfigDocument, GeneralConfig,
    LogConfig, ProxyConfig, UiConfig, CLOSE_ACTIONS, THEMES,
};
use proxydeck_daemon::Backend;

use crate::config_editor::{ConfigEditor, Section};

/// `Proxy`: mode, port, certificate flag
pub struct ProxySettings;

impl Section for ProxySettings {
    type Value = ProxyConfig;
    const NAME: &'static str = "proxy";

    fn project(document: &ConfigDocument) -> ProxyConfig {
        document.proxy_config()
    }

    fn apply(document: &mut ConfigDocument, value: &ProxyConfig) {
        document.set_proxy_config(value);
    }

    fn saved_message() -> String {
        "Configuration updated".to_string()
    }

    fn save_failed_message() -> String {
        "Failed to update configuration".to_string()
    }
}

/// `UI.Theme` alone; the rest of `UI` is left as found
pub struct ThemeSettings;

impl Section for ThemeSettings {
    type Value = String;
    const NAME: &'static str = "theme";

    fn project(document: &ConfigDocument) -> String {
        document.theme()
    }

    fn apply(document: &mut ConfigDocument, value: &String) {
        if !is_known_theme(value) {
            warn!("Saving unknown theme '{}'", value);
        }
        document.set_theme(value);
    }

    fn saved_message() -> String {
        "Theme saved".to_string()
    }

    fn save_failed_message() -> String {
        "Failed to save theme".to_string()
    }
}

/// The whole `UI` section
pub struct UiSettings;

impl Section for UiSettings {
    type Value = UiConfig;
    const NAME: &'static str = "ui";

    fn project(document: &ConfigDocument) -> UiConfig {
        document.ui_config()
    }

    fn apply(document: &mut ConfigDocument, value: &UiConfig) {
        document.set_ui_config(value);
    }

    fn saved_message() -> String {
        "UI settings saved".to_string()
    }
}

pub struct GeneralSettings;

impl Section for GeneralSettings {
    type Value = GeneralConfig;
    const NAME: &'static str = "general";

    fn project(document: &ConfigDocument) -> GeneralConfig {
        document.general_config()
    }

    fn apply(document: &mut ConfigDocument, value: &GeneralConfig) {
        if !is_known_close_action(&value.close_action) {
            warn!(
                "Saving unknown close action '{}' (expected one of {:?})",
                value.close_action, CLOSE_ACTIONS
            );
        }
        document.set_general_config(value);
    }
}

pub struct LogSettings;

impl Section for LogSettings {
    type Value = LogConfig;
    const NAME: &'static str = "log";

    fn project(document: &ConfigDocument) -> LogConfig {
        document.log_config()
    }

    fn apply(document: &mut ConfigDocument, value: &LogConfig) {
        document.set_log_config(value);
    }
}

pub type ProxyEditor<B> = ConfigEditor<B, ProxySettings>;
pub type ThemeEditor<B> = ConfigEditor<B, ThemeSettings>;
pub type UiEditor<B> = ConfigEditor<B, UiSettings>;
pub type GeneralEditor<B> = ConfigEditor<B, GeneralSettings>;
pub type LogEditor<B> = ConfigEditor<B, LogSettings>;

impl<B: Backend + Sync + 'static> ConfigEditor<B, ThemeSettings> {
    /// Known theme names, `light` first
    pub fn themes(&self) -> &'static [&'static str] {
        THEMES
    }

    /// Show `theme` locally, then persist it
    ///
    /// The local view keeps the new theme even if persisting fails.
    pub async fn change_theme(&self, theme: &str) -> CommandOutcome {
        self.set_local(theme.to_string());
        self.save(theme.to_string()).await
    }
}

//! Settings loader for config.toml

use std::path::{Path, PathBuf};

use proxydeck_core::prelude::*;

use super::types::Settings;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "proxydeck";

/// `<config_dir>/proxydeck`, if the platform has a config directory
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Load settings from `<dir>/config.toml`
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(dir: &Path) -> Settings {
    let config_path = dir.join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Write a commented default config.toml into `dir`
///
/// An existing file is left alone. Returns the path of the config file.
pub fn init_config_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::config(format!("Failed to create {:?}: {}", dir, e)))?;
    }

    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        std::fs::write(&config_path, generate_default_config())
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Wrote default settings to {:?}", config_path);
    }

    Ok(config_path)
}

fn generate_default_config() -> String {
    r#"# proxydeck client configuration

[monitor]
poll_interval_ms = 3000       # Status refresh cadence (minimum 500)

[notifications]
retry_window_ms = 100         # How long a notification waits for a display
default_duration_ms = 3000

[backend]
url = "ws://127.0.0.1:34115/rpc"
request_timeout_ms = 30000    # Per request (minimum 1000)
"#
    .to_string()
}

//! Client configuration
//!
//! `<config_dir>/proxydeck/config.toml` holds the client's own settings.

pub mod settings;
pub mod types;

pub use settings::{default_config_dir, init_config_dir, load_settings};
pub use types::*;

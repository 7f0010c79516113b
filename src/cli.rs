//! Command-line arguments

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use proxydeck_core::ProxyMode;

/// proxydeck - headless control client for the proxy backend
#[derive(Parser, Debug)]
#[command(name = "proxydeck", version)]
#[command(about = "Control the proxy backend from the command line", long_about = None)]
pub struct Args {
    /// Backend bridge URL (overrides `[backend] url` from config.toml)
    #[arg(long, value_name = "URL", global = true)]
    pub url: Option<String>,

    /// Directory holding config.toml
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current proxy status
    Status,

    /// Start the proxy service
    Start,

    /// Stop the proxy service
    Stop,

    /// Start the proxy if it is stopped, stop it otherwise
    Toggle,

    /// Poll the backend and print status events until Ctrl-C
    Watch,

    /// Change proxy mode and/or listen port
    Proxy {
        #[arg(long, value_parser = parse_mode)]
        mode: Option<ProxyMode>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Save the UI theme
    Theme {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Install the proxy's CA certificate into the system trust store
    InstallCert,

    /// Write a default config.toml
    ConfigInit,
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Start => "start",
            Command::Stop => "stop",
            Command::Toggle => "toggle",
            Command::Watch => "watch",
            Command::Proxy { .. } => "proxy",
            Command::Theme { .. } => "theme",
            Command::InstallCert => "install-cert",
            Command::ConfigInit => "config-init",
        }
    }

    /// Whether the command talks to the backend
    pub fn needs_backend(&self) -> bool {
        !matches!(self, Command::ConfigInit)
    }
}

fn parse_mode(raw: &str) -> Result<ProxyMode, String> {
    raw.parse::<ProxyMode>().map_err(|e| e.to_string())
}

//! proxydeck - headless control client for the proxy backend
//!
//! This is the binary entry point. It connects to the backend bridge, runs
//! one subcommand through the Engine and reports on stdout as NDJSON.

mod cli;
mod headless;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

use proxydeck_app::config::{default_config_dir, init_config_dir, load_settings};
use proxydeck_app::{Engine, NotificationDisplay};
use proxydeck_core::{CommandOutcome, Notification, ProxyMode};
use proxydeck_daemon::{connect, RpcBackend};

use cli::{Args, Command};
use headless::HeadlessEvent;

/// Time left for the notification dispatcher to drain before exit
const NOTIFICATION_DRAIN: Duration = Duration::from_millis(50);

/// Prints notifications on stderr, keeping stdout for NDJSON
struct StderrDisplay;

impl NotificationDisplay for StderrDisplay {
    fn display(&self, notification: &Notification) {
        eprintln!("{}", notification);
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();

    proxydeck_core::logging::init()?;

    let config_dir = args.config_dir.clone().or_else(default_config_dir);

    if !args.command.needs_backend() {
        return init_config(config_dir);
    }

    let settings = config_dir
        .as_deref()
        .map(load_settings)
        .unwrap_or_default();
    let url = args
        .url
        .clone()
        .unwrap_or_else(|| settings.backend.url.clone());

    let connection = match connect(&url, settings.backend.request_timeout()).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Could not connect to {}: {}", url, e);
            HeadlessEvent::error(e.to_string(), true).emit();
            return Ok(ExitCode::FAILURE);
        }
    };
    HeadlessEvent::connected(&url).emit();

    let engine = Engine::new(Arc::new(connection.backend()), settings);
    engine.notifier().attach(Arc::new(StderrDisplay));

    let success = run_command(&engine, &args.command).await;

    engine.deactivate();
    drop(engine);
    tokio::time::sleep(NOTIFICATION_DRAIN).await;
    connection.disconnect().await;

    info!("proxydeck exiting ({})", if success { "ok" } else { "failed" });
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_config(config_dir: Option<PathBuf>) -> Result<ExitCode> {
    let Some(dir) = config_dir else {
        HeadlessEvent::error("No config directory available; pass --config-dir", true).emit();
        return Ok(ExitCode::FAILURE);
    };

    let path = init_config_dir(&dir)?;
    HeadlessEvent::config_initialized(&path).emit();
    Ok(ExitCode::SUCCESS)
}

/// Run one backend command; returns whether it succeeded
async fn run_command(engine: &Engine<RpcBackend>, command: &Command) -> bool {
    let outcome = match command {
        Command::Status => {
            let outcome = engine.refresh_status().await;
            if outcome.success {
                HeadlessEvent::status(engine.status()).emit();
            }
            outcome
        }
        Command::Start => with_status(engine, engine.start_proxy().await),
        Command::Stop => with_status(engine, engine.stop_proxy().await),
        Command::Toggle => {
            // Toggle decides from the cached flag, which starts out stopped
            engine.refresh_status().await;
            with_status(engine, engine.toggle_proxy().await)
        }
        Command::Watch => return watch(engine).await,
        Command::Proxy { mode, port } => update_proxy(engine, *mode, *port).await,
        Command::Theme { name } => engine.change_theme(name).await,
        Command::InstallCert => engine.install_certificate().await,
        Command::ConfigInit => CommandOutcome::failure("config-init does not use the backend"),
    };

    HeadlessEvent::command_completed(command.name(), &outcome).emit();
    outcome.success
}

fn with_status(engine: &Engine<RpcBackend>, outcome: CommandOutcome) -> CommandOutcome {
    HeadlessEvent::status(engine.status()).emit();
    outcome
}

async fn update_proxy(
    engine: &Engine<RpcBackend>,
    mode: Option<ProxyMode>,
    port: Option<u16>,
) -> CommandOutcome {
    if mode.is_none() && port.is_none() {
        return CommandOutcome::failure("Nothing to change: pass --mode and/or --port");
    }

    let loaded = engine.proxy().load().await;
    if !loaded.success {
        return loaded;
    }

    let mut config = engine.proxy().value();
    if let Some(mode) = mode {
        config.mode = mode;
    }
    if let Some(port) = port {
        config.port = port;
    }

    engine.save_proxy(config).await
}

/// Activate the engine and stream its events until Ctrl-C
async fn watch(engine: &Engine<RpcBackend>) -> bool {
    let mut events = engine.subscribe();
    engine.activate().await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Watch interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => HeadlessEvent::from(event).emit(),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Watch output lagged, skipped {} event(s)", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    HeadlessEvent::shutdown().emit();
    true
}

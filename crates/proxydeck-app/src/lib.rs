//! proxydeck-app - State synchronization and orchestration for proxydeck
//!
//! This crate keeps local views of backend-owned state correct while a poller
//! refreshes them and user commands mutate them: the status monitor, the
//! read-modify-write editors over the shared configuration document, the
//! notification queue, client settings, and the Engine that composes them.

pub mod certificate;
pub mod config;
pub mod config_editor;
pub mod document_store;
pub mod engine;
pub mod engine_event;
pub mod notifications;
pub mod sections;
pub mod status_monitor;

// Re-export primary types
pub use certificate::CertificateInstall;
pub use config::Settings;
pub use config_editor::{ConfigEditor, Section};
pub use document_store::DocumentStore;
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use notifications::{ChannelDisplay, NotificationDisplay, Notifier};
pub use sections::{
    GeneralEditor, GeneralSettings, LogEditor, LogSettings, ProxyEditor, ProxySettings,
    ThemeEditor, ThemeSettings, UiEditor, UiSettings,
};
pub use status_monitor::StatusMonitor;

// Re-export backend types for front ends
pub use proxydeck_daemon::{connect, Backend, BackendConnection, RpcBackend};

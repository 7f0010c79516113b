//! Engine - shared orchestration for the proxydeck client
//!
//! The Engine owns one [`StatusMonitor`], one [`DocumentStore`] with an
//! editor per section, and the [`Notifier`]. Front ends call its commands,
//! show the returned [`CommandOutcome`], and subscribe to [`EngineEvent`]s.
//! Every command outcome is also routed to the notifier.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use proxydeck_core::prelude::*;
use proxydeck_core::{
    CommandOutcome, GeneralConfig, LogConfig, ProxyConfig, StatusView, UiConfig,
};
use proxydeck_daemon::Backend;

use crate::config::Settings;
use crate::config_editor::{ConfigEditor, Section};
use crate::document_store::DocumentStore;
use crate::engine_event::EngineEvent;
use crate::notifications::Notifier;
use crate::sections::{
    GeneralEditor, LogEditor, ProxyEditor, ThemeEditor, ThemeSettings, UiEditor,
};
use crate::status_monitor::StatusMonitor;

const EVENT_CHANNEL_CAPACITY: usize = 256;

pub struct Engine<B> {
    settings: Settings,
    monitor: StatusMonitor<B>,
    store: Arc<DocumentStore<B>>,
    proxy: ProxyEditor<B>,
    theme: ThemeEditor<B>,
    ui: UiEditor<B>,
    general: GeneralEditor<B>,
    log: LogEditor<B>,
    notifier: Notifier,
    event_tx: broadcast::Sender<EngineEvent>,
    active: AtomicBool,
    status_forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl<B> Engine<B> {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn monitor(&self) -> &StatusMonitor<B> {
        &self.monitor
    }

    pub fn store(&self) -> &Arc<DocumentStore<B>> {
        &self.store
    }

    pub fn proxy(&self) -> &ProxyEditor<B> {
        &self.proxy
    }

    pub fn theme(&self) -> &ThemeEditor<B> {
        &self.theme
    }

    pub fn ui(&self) -> &UiEditor<B> {
        &self.ui
    }

    pub fn general(&self) -> &GeneralEditor<B> {
        &self.general
    }

    pub fn log(&self) -> &LogEditor<B> {
        &self.log
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Last known proxy status
    pub fn status(&self) -> StatusView {
        self.monitor.view()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Subscribe to engine events
    ///
    /// Lagging subscribers lose the oldest events; see
    /// `broadcast::error::RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Stop polling and emit [`EngineEvent::Shutdown`]
    ///
    /// Idempotent; also runs on drop. In-flight commands are not cancelled.
    pub fn deactivate(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        self.monitor.stop_monitoring();
        let forwarder = self
            .status_forwarder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = forwarder {
            task.abort();
        }

        self.emit(EngineEvent::Shutdown);
        info!("Engine deactivated");
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.event_tx.send(event);
    }

    fn report(&self, title: &str, outcome: &CommandOutcome) {
        if outcome.success {
            self.notifier.success(title, outcome.message.clone());
        } else {
            self.notifier.error(title, outcome.message.clone());
        }
    }
}

impl<B: Backend + Sync + 'static> Engine<B> {
    /// Build an engine over `backend`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(backend: Arc<B>, settings: Settings) -> Self {
        let store = Arc::new(DocumentStore::new(backend.clone()));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            monitor: StatusMonitor::new(backend, settings.monitor.poll_interval()),
            proxy: ProxyEditor::new(store.clone()),
            theme: ThemeEditor::new(store.clone()),
            ui: UiEditor::new(store.clone()),
            general: GeneralEditor::new(store.clone()),
            log: LogEditor::new(store.clone()),
            store,
            notifier: Notifier::spawn(&settings.notifications),
            event_tx,
            active: AtomicBool::new(false),
            status_forwarder: Mutex::new(None),
            settings,
        }
    }

    /// Start polling and load every section
    ///
    /// Calling this on an active engine does nothing.
    pub async fn activate(&self) {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!("Engine already active");
            return;
        }

        self.spawn_status_forwarder();
        self.monitor.start_monitoring();
        let failed = self
            .load_sections()
            .await
            .into_iter()
            .filter(|outcome| !outcome.success)
            .count();
        info!("Engine activated ({} section load failure(s))", failed);
    }

    fn spawn_status_forwarder(&self) {
        let mut status_rx = self.monitor.subscribe();
        let event_tx = self.event_tx.clone();

        let task = tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = status_rx.borrow_and_update().clone();
                let _ = event_tx.send(EngineEvent::StatusRefreshed { status });
            }
        });

        let previous = self
            .status_forwarder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn load_sections(&self) -> Vec<CommandOutcome> {
        let (proxy, theme, ui, general, log) = tokio::join!(
            self.proxy.load(),
            self.theme.load(),
            self.ui.load(),
            self.general.load(),
            self.log.load(),
        );
        vec![proxy, theme, ui, general, log]
    }

    // ── Status commands ──────────────────────────────────────────────────

    pub async fn refresh_status(&self) -> CommandOutcome {
        self.monitor.refresh_status().await
    }

    pub async fn start_proxy(&self) -> CommandOutcome {
        let outcome = self.monitor.start().await;
        self.report("Proxy", &outcome);
        outcome
    }

    pub async fn stop_proxy(&self) -> CommandOutcome {
        let outcome = self.monitor.stop().await;
        self.report("Proxy", &outcome);
        outcome
    }

    pub async fn toggle_proxy(&self) -> CommandOutcome {
        let outcome = self.monitor.toggle().await;
        self.report("Proxy", &outcome);
        outcome
    }

    // ── Configuration commands ───────────────────────────────────────────

    pub async fn save_proxy(&self, config: ProxyConfig) -> CommandOutcome {
        self.save_section(&self.proxy, config, "Configuration").await
    }

    pub async fn save_ui(&self, config: UiConfig) -> CommandOutcome {
        self.save_section(&self.ui, config, "Appearance").await
    }

    pub async fn save_general(&self, config: GeneralConfig) -> CommandOutcome {
        self.save_section(&self.general, config, "General").await
    }

    pub async fn save_log(&self, config: LogConfig) -> CommandOutcome {
        self.save_section(&self.log, config, "Logging").await
    }

    async fn save_section<S: Section>(
        &self,
        editor: &ConfigEditor<B, S>,
        value: S::Value,
        title: &str,
    ) -> CommandOutcome {
        let outcome = editor.save(value).await;
        if outcome.success {
            self.emit(EngineEvent::SectionSaved { section: S::NAME });
        }
        self.report(title, &outcome);
        outcome
    }

    pub async fn change_theme(&self, theme: &str) -> CommandOutcome {
        let outcome = self.theme.change_theme(theme).await;
        if outcome.success {
            self.emit(EngineEvent::SectionSaved {
                section: ThemeSettings::NAME,
            });
        }
        self.report("Theme", &outcome);
        outcome
    }

    /// Install the CA certificate; on success every cached view is reloaded
    pub async fn install_certificate(&self) -> CommandOutcome {
        let result = self.proxy.install_certificate().await;

        if result.reload_required {
            self.emit(EngineEvent::CertificateInstalled);
            self.reload_all().await;
        }

        self.report("Certificate", &result.outcome);
        result.outcome
    }

    /// Discard every cached view and re-derive it from the backend
    pub async fn reload(&self) -> CommandOutcome {
        let outcome = self.reload_all().await;
        self.report("Reload", &outcome);
        outcome
    }

    async fn reload_all(&self) -> CommandOutcome {
        info!("Reloading all cached state");

        self.proxy.invalidate();
        self.theme.invalidate();
        self.ui.invalidate();
        self.general.invalidate();
        self.log.invalidate();

        let mut outcomes = self.load_sections().await;
        outcomes.push(self.monitor.refresh_status().await);

        let failures: Vec<String> = outcomes
            .into_iter()
            .filter(|outcome| !outcome.success)
            .map(|outcome| outcome.message)
            .collect();
        let success = failures.is_empty();
        self.emit(EngineEvent::Reloaded { success });

        if success {
            CommandOutcome::success("Reloaded")
        } else {
            CommandOutcome::failure(failures.join("; "))
        }
    }
}

impl<B> Drop for Engine<B> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::ChannelDisplay;
    use proxydeck_core::{ConfigDocument, Notification, Severity};
    use proxydeck_daemon::test_utils::{BackendCall, Fault, MockBackend};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn engine_with(
        document: serde_json::Value,
    ) -> (
        Arc<MockBackend>,
        Engine<MockBackend>,
        mpsc::UnboundedReceiver<Notification>,
    ) {
        let document: ConfigDocument = serde_json::from_value(document).unwrap();
        let backend = Arc::new(MockBackend::with_document(document));
        let engine = Engine::new(backend.clone(), Settings::default());
        let (display, rx) = ChannelDisplay::new();
        engine.notifier().attach(Arc::new(display));
        (backend, engine, rx)
    }

    #[tokio::test]
    async fn test_activate_loads_sections_and_polls() {
        let (backend, engine, _rx) = engine_with(json!({
            "UI": { "Theme": "dark" },
            "Proxy": { "Port": 1080 }
        }));
        let mut events = engine.subscribe();

        engine.activate().await;

        assert!(engine.is_active());
        assert!(engine.monitor().is_monitoring());
        assert_eq!(engine.theme().value(), "dark");
        assert_eq!(engine.proxy().value().port, 1080);
        assert!(engine.general().is_loaded());

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event_type(), "status_refreshed");
        assert!(backend.call_count(BackendCall::GetProcessStatus) >= 1);
    }

    #[tokio::test]
    async fn test_start_proxy_notifies_success() {
        let (_, engine, mut rx) = engine_with(json!({}));

        let outcome = engine.start_proxy().await;
        assert!(outcome.success);
        assert!(engine.status().is_running);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.severity, Severity::Success);
        assert_eq!(notification.title, "Proxy");
        assert_eq!(notification.body, "Proxy service started");
    }

    #[tokio::test]
    async fn test_failed_command_notifies_error() {
        let (backend, engine, mut rx) = engine_with(json!({}));
        backend.fail(BackendCall::StopProcess, Fault::Transport);

        let outcome = engine.stop_proxy().await;
        assert!(!outcome.success);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.severity, Severity::Error);
        assert!(notification.body.starts_with("Failed to stop proxy"));
    }

    #[tokio::test]
    async fn test_toggle_proxy_uses_local_flag() {
        let (backend, engine, _rx) = engine_with(json!({}));

        engine.toggle_proxy().await;
        engine.toggle_proxy().await;

        assert_eq!(backend.call_count(BackendCall::StartProcess), 1);
        assert_eq!(backend.call_count(BackendCall::StopProcess), 1);
        assert!(!engine.status().is_running);
    }

    #[tokio::test]
    async fn test_change_theme_emits_section_saved() {
        let (backend, engine, _rx) = engine_with(json!({}));
        let mut events = engine.subscribe();

        assert!(engine.change_theme("nord").await.success);

        assert_eq!(backend.document().theme(), "nord");
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::SectionSaved { section: "theme" }
        );
    }

    #[tokio::test]
    async fn test_save_proxy_notifies_configuration() {
        let (backend, engine, mut rx) = engine_with(json!({}));

        let config = ProxyConfig {
            port: 8888,
            ..ProxyConfig::default()
        };
        assert!(engine.save_proxy(config).await.success);
        assert_eq!(backend.document().proxy_config().port, 8888);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.title, "Configuration");
        assert_eq!(notification.body, "Configuration updated");
    }

    #[tokio::test]
    async fn test_section_saves_are_reported() {
        let (backend, engine, mut rx) = engine_with(json!({}));
        let mut events = engine.subscribe();

        let mut log = engine.log().value();
        log.level = "info".to_string();
        assert!(engine.save_log(log).await.success);
        assert_eq!(
            events.recv().await.unwrap(),
            EngineEvent::SectionSaved { section: "log" }
        );
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.title, "Logging");
        assert_eq!(notification.severity, Severity::Success);

        backend.fail(BackendCall::SetConfigDocument, Fault::Transport);
        let mut general = engine.general().value();
        general.auto_start = true;
        assert!(!engine.save_general(general).await.success);
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.title, "General");
        assert_eq!(notification.severity, Severity::Error);
        assert!(notification.body.starts_with("Failed to save general settings"));

        let mut ui = engine.ui().value();
        ui.width = 1600;
        assert!(!engine.save_ui(ui).await.success);
        assert_eq!(rx.recv().await.unwrap().title, "Appearance");
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_install_certificate_reloads_every_section() {
        let (backend, engine, mut rx) = engine_with(json!({
            "UI": { "Theme": "light" },
            "Proxy": { "Mode": "http", "Port": 9527, "CertInstalled": false }
        }));
        engine.activate().await;
        let mut events = engine.subscribe();

        // Other clients change sections this engine has cached.
        backend.edit_document(|doc| {
            doc.set_theme("dracula");
            let mut general = doc.general_config();
            general.close_action = "exit".to_string();
            doc.set_general_config(&general);
            let mut log = doc.log_config();
            log.level = "error".to_string();
            doc.set_log_config(&log);
        });
        assert_eq!(engine.theme().value(), "light");

        let outcome = engine.install_certificate().await;
        assert!(outcome.success);

        let stored = backend.document();
        assert!(stored.proxy_config().cert_installed);
        assert_eq!(engine.proxy().value(), stored.proxy_config());
        assert_eq!(engine.theme().value(), stored.theme());
        assert_eq!(engine.ui().value(), stored.ui_config());
        assert_eq!(engine.general().value(), stored.general_config());
        assert_eq!(engine.log().value(), stored.log_config());

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event.event_type());
        }
        assert!(seen.contains(&"certificate_installed"));
        assert!(seen.contains(&"reloaded"));

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.title, "Certificate");
        assert_eq!(notification.severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_rejected_certificate_does_not_reload() {
        let (backend, engine, mut rx) = engine_with(json!({}));
        backend.set_install_result(false);

        let outcome = engine.install_certificate().await;
        assert!(!outcome.success);
        assert_eq!(backend.call_count(BackendCall::GetConfigDocument), 0);

        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_reload_reports_failures() {
        let (backend, engine, _rx) = engine_with(json!({}));
        backend.fail(BackendCall::GetConfigDocument, Fault::Transport);

        let outcome = engine.reload().await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("Failed to load proxy settings"));
        assert!(!engine.proxy().is_loaded());
    }

    #[tokio::test]
    async fn test_deactivate_is_idempotent() {
        let (_, engine, _rx) = engine_with(json!({}));
        let mut events = engine.subscribe();

        engine.deactivate();
        assert!(events.try_recv().is_err());

        engine.activate().await;
        engine.deactivate();
        engine.deactivate();
        assert!(!engine.monitor().is_monitoring());

        let mut shutdowns = 0;
        while let Ok(event) = events.try_recv() {
            if event == EngineEvent::Shutdown {
                shutdowns += 1;
            }
        }
        assert_eq!(shutdowns, 1);
    }
}

//! Test utilities for backend consumers
//!
//! [`MockBackend`] keeps the process status and configuration document in
//! memory, records every call, and lets a test inject faults, latency and
//! writes from a concurrent client.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use proxydeck_core::prelude::*;
use proxydeck_core::{ConfigDocument, ProcessStatus};

use crate::backend::Backend;

/// One RPC as seen by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendCall {
    GetProcessStatus,
    StartProcess,
    StopProcess,
    GetConfigDocument,
    SetConfigDocument,
    InstallCertificate,
}

/// Failure to produce for a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The backend cannot be reached
    Transport,
    /// The backend answers with an error
    Rejected,
}

impl Fault {
    fn to_error(self, call: BackendCall) -> Error {
        match self {
            Fault::Transport => Error::transport(format!("injected fault on {:?}", call)),
            Fault::Rejected => Error::rejected(format!("injected rejection of {:?}", call)),
        }
    }
}

type DocumentHook = Box<dyn FnOnce(&mut ConfigDocument) + Send>;

struct MockState {
    status: ProcessStatus,
    document: ConfigDocument,
    calls: Vec<BackendCall>,
    writes: Vec<ConfigDocument>,
    faults: HashMap<BackendCall, Fault>,
    install_result: bool,
    start_comes_up: bool,
    after_next_get_config: Option<DocumentHook>,
    latency: Duration,
    scripted_status: VecDeque<(ProcessStatus, Duration)>,
}

/// In-memory [`Backend`]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Stopped proxy, empty document
    pub fn new() -> Self {
        Self::with_document(ConfigDocument::default())
    }

    pub fn with_document(document: ConfigDocument) -> Self {
        Self {
            state: Mutex::new(MockState {
                status: ProcessStatus::default(),
                document,
                calls: Vec::new(),
                writes: Vec::new(),
                faults: HashMap::new(),
                install_result: true,
                start_comes_up: true,
                after_next_get_config: None,
                latency: Duration::ZERO,
                scripted_status: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Setup ────────────────────────────────────────────────────────────

    pub fn fail(&self, call: BackendCall, fault: Fault) {
        self.lock().faults.insert(call, fault);
    }

    pub fn restore(&self, call: BackendCall) {
        self.lock().faults.remove(&call);
    }

    pub fn set_install_result(&self, installed: bool) {
        self.lock().install_result = installed;
    }

    /// Whether a successful `start_process` actually marks the proxy running
    pub fn set_start_comes_up(&self, comes_up: bool) {
        self.lock().start_comes_up = comes_up;
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }

    /// Queue an answer for a later `get_process_status`: `status`, after `delay`
    ///
    /// Scripted answers are consumed in call order, so two overlapping
    /// refreshes can be made to complete in the opposite order.
    pub fn script_status(&self, status: ProcessStatus, delay: Duration) {
        self.lock().scripted_status.push_back((status, delay));
    }

    pub fn set_status(&self, status: ProcessStatus) {
        self.lock().status = status;
    }

    /// Replace the stored document, as another client would
    pub fn set_document(&self, document: ConfigDocument) {
        self.lock().document = document;
    }

    /// Edit the stored document in place, as another client would
    pub fn edit_document(&self, edit: impl FnOnce(&mut ConfigDocument)) {
        edit(&mut self.lock().document);
    }

    /// Edit the stored document right after the next fetch returns its copy
    ///
    /// Simulates a concurrent writer landing between a fetch and the write
    /// that follows it.
    pub fn after_next_get_config(&self, hook: impl FnOnce(&mut ConfigDocument) + Send + 'static) {
        self.lock().after_next_get_config = Some(Box::new(hook));
    }

    // ── Inspection ───────────────────────────────────────────────────────

    pub fn status(&self) -> ProcessStatus {
        self.lock().status.clone()
    }

    pub fn document(&self) -> ConfigDocument {
        self.lock().document.clone()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, call: BackendCall) -> usize {
        self.lock().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Every document passed to `set_config_document`, oldest first
    pub fn writes(&self) -> Vec<ConfigDocument> {
        self.lock().writes.clone()
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Record the call and return its latency, or the injected fault
    fn begin(&self, call: BackendCall) -> Result<Duration> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.faults.get(&call) {
            Some(fault) => Err(fault.to_error(call)),
            None => Ok(state.latency),
        }
    }

    async fn enter(&self, call: BackendCall) -> Result<()> {
        let latency = self.begin(call)?;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    async fn get_process_status(&self) -> Result<ProcessStatus> {
        let latency = self.begin(BackendCall::GetProcessStatus)?;
        let scripted = self.lock().scripted_status.pop_front();
        if let Some((status, delay)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(status);
        }

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(self.status())
    }

    async fn start_process(&self) -> Result<()> {
        self.enter(BackendCall::StartProcess).await?;
        let mut state = self.lock();
        if state.start_comes_up {
            let proxy = state.document.proxy_config();
            let running = ProcessStatus {
                is_running: true,
                started_at_epoch_seconds: Some(chrono::Utc::now().timestamp()),
                uptime_seconds: 0,
                listen_port: proxy.port,
                mode: proxy.mode,
                ..state.status.clone()
            };
            state.status = running;
        }
        Ok(())
    }

    async fn stop_process(&self) -> Result<()> {
        self.enter(BackendCall::StopProcess).await?;
        let mut state = self.lock();
        state.status.is_running = false;
        state.status.started_at_epoch_seconds = None;
        state.status.uptime_seconds = 0;
        state.status.active_connections = 0;
        Ok(())
    }

    async fn get_config_document(&self) -> Result<ConfigDocument> {
        self.enter(BackendCall::GetConfigDocument).await?;
        let mut state = self.lock();
        let copy = state.document.clone();
        if let Some(hook) = state.after_next_get_config.take() {
            hook(&mut state.document);
        }
        Ok(copy)
    }

    async fn set_config_document(&self, document: &ConfigDocument) -> Result<()> {
        self.enter(BackendCall::SetConfigDocument).await?;
        let mut state = self.lock();
        state.document = document.clone();
        state.writes.push(document.clone());
        Ok(())
    }

    async fn install_certificate(&self) -> Result<bool> {
        self.enter(BackendCall::InstallCertificate).await?;
        Ok(self.lock().install_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_and_stop() {
        let mock = MockBackend::new();
        mock.start_process().await.unwrap();
        assert!(mock.status().is_running);
        assert_eq!(mock.status().listen_port, 9527);

        mock.stop_process().await.unwrap();
        assert!(!mock.status().is_running);
        assert_eq!(
            mock.calls(),
            vec![BackendCall::StartProcess, BackendCall::StopProcess]
        );
    }

    #[tokio::test]
    async fn test_start_that_never_comes_up() {
        let mock = MockBackend::new();
        mock.set_start_comes_up(false);
        mock.start_process().await.unwrap();
        assert!(!mock.status().is_running);
    }

    #[tokio::test]
    async fn test_fault_injection_and_restore() {
        let mock = MockBackend::new();
        mock.fail(BackendCall::GetProcessStatus, Fault::Transport);
        assert!(mock.get_process_status().await.unwrap_err().is_transport());

        mock.fail(BackendCall::GetProcessStatus, Fault::Rejected);
        assert!(mock.get_process_status().await.unwrap_err().is_rejection());

        mock.restore(BackendCall::GetProcessStatus);
        assert!(mock.get_process_status().await.is_ok());
        assert_eq!(mock.call_count(BackendCall::GetProcessStatus), 3);
    }

    #[tokio::test]
    async fn test_after_next_get_config_hook_runs_once() {
        let mock = MockBackend::new();
        mock.after_next_get_config(|doc| doc.set_theme("dark"));

        let first = mock.get_config_document().await.unwrap();
        assert_eq!(first.theme(), "light");
        assert_eq!(mock.document().theme(), "dark");

        mock.set_document(ConfigDocument::default());
        let _ = mock.get_config_document().await.unwrap();
        assert_eq!(mock.document().theme(), "light");
    }

    #[tokio::test]
    async fn test_writes_are_recorded() {
        let mock = MockBackend::new();
        let mut doc = ConfigDocument::default();
        doc.set_theme("nord");
        mock.set_config_document(&doc).await.unwrap();

        assert_eq!(mock.writes(), vec![doc.clone()]);
        assert_eq!(mock.document(), doc);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_calls() {
        let mock = MockBackend::new();
        mock.set_latency(Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        mock.install_certificate().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}

//! Proxy process status: polling, start/stop/toggle, displayable view
//!
//! The view lives in a `watch` channel. Every refresh that completes replaces
//! it wholesale, so the refresh that finishes last wins no matter which was
//! issued first. Timer-driven and command-driven refreshes are not
//! serialized against each other.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use proxydeck_core::prelude::*;
use proxydeck_core::{CommandOutcome, StatusView};
use proxydeck_daemon::Backend;

struct Shared<B> {
    backend: Arc<B>,
    view_tx: watch::Sender<StatusView>,
}

impl<B: Backend + Sync + 'static> Shared<B> {
    async fn fetch(&self) -> Result<StatusView> {
        let status = self.backend.get_process_status().await?;
        let view = StatusView::from(&status);
        self.view_tx.send_replace(view.clone());
        Ok(view)
    }
}

/// Handle to the running poll task
struct Poller {
    shutdown_tx: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

/// Keeps a local view of the backend's proxy process status
pub struct StatusMonitor<B> {
    shared: Arc<Shared<B>>,
    poll_interval: Duration,
    poller: Mutex<Option<Poller>>,
}

impl<B> StatusMonitor<B> {
    /// Last known status
    pub fn view(&self) -> StatusView {
        self.shared.view_tx.borrow().clone()
    }

    /// Receiver notified after every completed refresh
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.shared.view_tx.subscribe()
    }

    /// Local `is_running` flag; no backend call
    pub fn is_running(&self) -> bool {
        self.shared.view_tx.borrow().is_running
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_monitoring(&self) -> bool {
        self.poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Cancel the poll timer
    ///
    /// A no-op when monitoring is not active. A refresh already in flight is
    /// left to complete.
    pub fn stop_monitoring(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(poller) = poller {
            let _ = poller.shutdown_tx.send(true);
            info!("Status monitoring stopped");
        }
    }
}

impl<B: Backend + Sync + 'static> StatusMonitor<B> {
    pub fn new(backend: Arc<B>, poll_interval: Duration) -> Self {
        let (view_tx, _) = watch::channel(StatusView::default());
        Self {
            shared: Arc::new(Shared { backend, view_tx }),
            poll_interval,
            poller: Mutex::new(None),
        }
    }

    /// Query the backend and replace the view
    ///
    /// On failure the previous view is kept.
    pub async fn refresh_status(&self) -> CommandOutcome {
        match self.shared.fetch().await {
            Ok(_) => CommandOutcome::success("Status refreshed"),
            Err(e) => {
                warn!("Status refresh failed: {}", e);
                CommandOutcome::from_error("Failed to refresh status", &e)
            }
        }
    }

    /// Ask the backend to start the proxy, then refresh
    ///
    /// Success reflects only the start RPC. Whether the process actually came
    /// up shows in the refreshed view, or in a later poll.
    pub async fn start(&self) -> CommandOutcome {
        let result = self.shared.backend.start_process().await;
        self.refresh_status().await;

        match result {
            Ok(()) => CommandOutcome::success("Proxy service started"),
            Err(e) => {
                error!("Failed to start proxy: {}", e);
                CommandOutcome::from_error("Failed to start proxy", &e)
            }
        }
    }

    /// Ask the backend to stop the proxy, then refresh
    pub async fn stop(&self) -> CommandOutcome {
        let result = self.shared.backend.stop_process().await;
        self.refresh_status().await;

        match result {
            Ok(()) => CommandOutcome::success("Proxy service stopped"),
            Err(e) => {
                error!("Failed to stop proxy: {}", e);
                CommandOutcome::from_error("Failed to stop proxy", &e)
            }
        }
    }

    /// Start or stop depending on the local `is_running` flag
    ///
    /// Reads the cached flag, not a fresh status. A poll landing in between
    /// can make this issue the wrong command; the next refresh corrects the
    /// view.
    pub async fn toggle(&self) -> CommandOutcome {
        if self.is_running() {
            self.stop().await
        } else {
            self.start().await
        }
    }

    /// Start the poll timer; the first refresh fires immediately
    ///
    /// Calling this while monitoring is already active does nothing.
    pub fn start_monitoring(&self) {
        let mut slot = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            debug!("Status monitoring already active");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            self.shared.clone(),
            self.poll_interval,
            shutdown_rx,
        ));

        *slot = Some(Poller {
            shutdown_tx,
            _task: task,
        });
        info!("Status monitoring started (every {:?})", self.poll_interval);
    }
}

impl<B> Drop for StatusMonitor<B> {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

async fn poll_loop<B: Backend + Sync + 'static>(
    shared: Arc<Shared<B>>,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Transient failures are expected while the backend restarts.
                if let Err(e) = shared.fetch().await {
                    debug!("Status poll failed: {}", e);
                }
            }

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    debug!("Status poll task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxydeck_core::ProcessStatus;
    use proxydeck_daemon::test_utils::{BackendCall, Fault, MockBackend};

    const INTERVAL: Duration = Duration::from_secs(3);

    fn monitor() -> (Arc<MockBackend>, StatusMonitor<MockBackend>) {
        let backend = Arc::new(MockBackend::new());
        let monitor = StatusMonitor::new(backend.clone(), INTERVAL);
        (backend, monitor)
    }

    fn running_status(uptime: u64) -> ProcessStatus {
        ProcessStatus {
            is_running: true,
            started_at_epoch_seconds: Some(1_700_000_000),
            uptime_seconds: uptime,
            listen_port: 9527,
            active_connections: 3,
            total_requests: 42,
            ..ProcessStatus::default()
        }
    }

    #[tokio::test]
    async fn test_initial_view() {
        let (_, monitor) = monitor();
        let view = monitor.view();
        assert!(!view.is_running);
        assert_eq!(view.uptime, "00:00:00");
        assert_eq!(view.port, 8080);
    }

    #[tokio::test]
    async fn test_refresh_replaces_view() {
        let (backend, monitor) = monitor();
        backend.set_status(running_status(3661));

        assert!(monitor.refresh_status().await.success);

        let view = monitor.view();
        assert!(view.is_running);
        assert_eq!(view.uptime, "01:01:01");
        assert_eq!(view.active_connections, 3);
        assert!(view.started_at.is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_view() {
        let (backend, monitor) = monitor();
        backend.set_status(running_status(10));
        monitor.refresh_status().await;
        let before = monitor.view();

        backend.fail(BackendCall::GetProcessStatus, Fault::Transport);
        backend.set_status(ProcessStatus::default());

        let outcome = monitor.refresh_status().await;
        assert!(!outcome.success);
        assert_eq!(monitor.view(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_completed_refresh_wins() {
        let (backend, monitor) = monitor();
        // Issued first, answers last.
        backend.script_status(running_status(10), Duration::from_millis(200));
        // Issued second, answers first.
        backend.script_status(running_status(20), Duration::from_millis(50));

        let (first, second, midway) = tokio::join!(
            monitor.refresh_status(),
            async {
                tokio::task::yield_now().await;
                monitor.refresh_status().await
            },
            async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                monitor.view().uptime
            },
        );
        assert!(first.success && second.success);

        assert_eq!(midway, "00:00:20");
        assert_eq!(monitor.view().uptime, "00:00:10");
    }

    #[tokio::test]
    async fn test_toggle_when_stopped_starts() {
        let (backend, monitor) = monitor();

        let outcome = monitor.toggle().await;
        assert!(outcome.success);
        assert_eq!(outcome.message, "Proxy service started");
        assert_eq!(
            backend.calls(),
            vec![BackendCall::StartProcess, BackendCall::GetProcessStatus]
        );
        assert!(monitor.is_running());
    }

    #[tokio::test]
    async fn test_toggle_when_running_stops() {
        let (backend, monitor) = monitor();
        backend.set_status(running_status(5));
        monitor.refresh_status().await;
        backend.clear_calls();

        let outcome = monitor.toggle().await;
        assert!(outcome.success);
        assert_eq!(
            backend.calls(),
            vec![BackendCall::StopProcess, BackendCall::GetProcessStatus]
        );
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn test_failed_start_reports_failure_and_keeps_view() {
        let (backend, monitor) = monitor();
        monitor.refresh_status().await;
        let before = monitor.view();

        backend.fail(BackendCall::StartProcess, Fault::Rejected);
        let outcome = monitor.start().await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Failed to start proxy"));
        assert_eq!(monitor.view(), before);
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), 2);
    }

    #[tokio::test]
    async fn test_failed_stop_with_unreachable_backend() {
        let (backend, monitor) = monitor();
        backend.set_status(running_status(5));
        monitor.refresh_status().await;
        let before = monitor.view();

        backend.fail(BackendCall::StopProcess, Fault::Transport);
        backend.fail(BackendCall::GetProcessStatus, Fault::Transport);

        let outcome = monitor.stop().await;
        assert!(!outcome.success);
        assert_eq!(monitor.view(), before);
    }

    #[tokio::test]
    async fn test_start_that_never_comes_up_still_succeeds() {
        let (backend, monitor) = monitor();
        backend.set_start_comes_up(false);

        let outcome = monitor.start().await;
        assert!(outcome.success);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_refreshes_immediately_then_on_interval() {
        let (backend, monitor) = monitor();
        let mut rx = monitor.subscribe();

        monitor.start_monitoring();
        rx.changed().await.unwrap();
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), 1);

        tokio::time::sleep(INTERVAL * 2 + Duration::from_millis(10)).await;
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), 3);

        monitor.stop_monitoring();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_monitoring_twice_creates_one_timer() {
        let (backend, monitor) = monitor();

        monitor.start_monitoring();
        monitor.start_monitoring();
        assert!(monitor.is_monitoring());

        tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(10)).await;
        // Immediate tick plus three interval ticks, from a single timer.
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_monitoring_cancels_timer() {
        let (backend, monitor) = monitor();

        monitor.start_monitoring();
        tokio::time::sleep(Duration::from_millis(10)).await;
        monitor.stop_monitoring();
        assert!(!monitor.is_monitoring());

        let calls = backend.call_count(BackendCall::GetProcessStatus);
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), calls);
    }

    #[tokio::test]
    async fn test_stop_monitoring_when_never_started() {
        let (_, monitor) = monitor();
        monitor.stop_monitoring();
        monitor.stop_monitoring();
        assert!(!monitor.is_monitoring());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_are_swallowed() {
        let (backend, monitor) = monitor();
        backend.set_status(running_status(1));
        monitor.refresh_status().await;
        let before = monitor.view();

        backend.fail(BackendCall::GetProcessStatus, Fault::Transport);
        monitor.start_monitoring();
        tokio::time::sleep(INTERVAL * 2).await;

        assert!(monitor.is_monitoring());
        assert_eq!(monitor.view(), before);

        backend.restore(BackendCall::GetProcessStatus);
        backend.set_status(running_status(99));
        tokio::time::sleep(INTERVAL + Duration::from_millis(10)).await;
        assert_eq!(monitor.view().uptime, "00:01:39");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let backend = Arc::new(MockBackend::new());
        {
            let monitor = StatusMonitor::new(backend.clone(), INTERVAL);
            monitor.start_monitoring();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let calls = backend.call_count(BackendCall::GetProcessStatus);
        tokio::time::sleep(INTERVAL * 4).await;
        assert_eq!(backend.call_count(BackendCall::GetProcessStatus), calls);
    }
}

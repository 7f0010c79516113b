//! Notification queue decoupling producers from the display surface
//!
//! Producers call [`Notifier::show`] (or one of the severity helpers) at any
//! time, including before anything can display notifications. A single
//! dispatcher task drains the queue in FIFO order. When no display is
//! attached, a notification waits up to the retry window (measured from when
//! it was shown) for one to attach; after that it is dropped from the visual
//! path and only the log keeps it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use proxydeck_core::prelude::*;
use proxydeck_core::{Notification, Severity};

use crate::config::NotificationSettings;

/// A surface that can present notifications
pub trait NotificationDisplay: Send + Sync + 'static {
    fn display(&self, notification: &Notification);
}

/// Forwards notifications into an unbounded channel
///
/// Useful for front ends that render on their own task, and for tests.
#[derive(Debug, Clone)]
pub struct ChannelDisplay {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelDisplay {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationDisplay for ChannelDisplay {
    fn display(&self, notification: &Notification) {
        if self.tx.send(notification.clone()).is_err() {
            debug!("Notification display channel closed");
        }
    }
}

type SharedDisplay = Option<Arc<dyn NotificationDisplay>>;

struct Queued {
    notification: Notification,
    deadline: Instant,
}

/// Producer handle; cheap to clone
#[derive(Clone)]
pub struct Notifier {
    queue_tx: mpsc::UnboundedSender<Queued>,
    display_tx: Arc<watch::Sender<SharedDisplay>>,
    retry_window: Duration,
    default_duration: Duration,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("attached", &self.is_attached())
            .field("retry_window", &self.retry_window)
            .finish()
    }
}

impl Notifier {
    /// Create the queue and spawn its dispatcher
    ///
    /// Must be called from within a Tokio runtime. The dispatcher exits once
    /// every clone of the returned handle is dropped.
    pub fn spawn(settings: &NotificationSettings) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (display_tx, display_rx) = watch::channel::<SharedDisplay>(None);

        tokio::spawn(dispatch(queue_rx, display_rx));

        Self {
            queue_tx,
            display_tx: Arc::new(display_tx),
            retry_window: settings.retry_window(),
            default_duration: settings.default_duration(),
        }
    }

    /// Attach a display; queued notifications still inside their window go to it
    pub fn attach(&self, display: Arc<dyn NotificationDisplay>) {
        self.display_tx.send_replace(Some(display));
        debug!("Notification display attached");
    }

    pub fn detach(&self) {
        self.display_tx.send_replace(None);
        debug!("Notification display detached");
    }

    pub fn is_attached(&self) -> bool {
        self.display_tx.borrow().is_some()
    }

    /// Queue a notification with the default duration
    pub fn show(&self, severity: Severity, title: impl Into<String>, body: impl Into<String>) {
        self.show_for(severity, title, body, self.default_duration);
    }

    /// Queue a notification; never blocks and never fails
    pub fn show_for(
        &self,
        severity: Severity,
        title: impl Into<String>,
        body: impl Into<String>,
        duration: Duration,
    ) {
        let notification = Notification::new(severity, title, body, duration);
        record(&notification);

        let queued = Queued {
            notification,
            deadline: Instant::now() + self.retry_window,
        };

        if let Err(mpsc::error::SendError(queued)) = self.queue_tx.send(queued) {
            warn!("Dropped notification (dispatcher stopped): {}", queued.notification);
        }
    }

    pub fn success(&self, title: impl Into<String>, body: impl Into<String>) {
        self.show(Severity::Success, title, body);
    }

    pub fn error(&self, title: impl Into<String>, body: impl Into<String>) {
        self.show(Severity::Error, title, body);
    }

    pub fn info(&self, title: impl Into<String>, body: impl Into<String>) {
        self.show(Severity::Info, title, body);
    }

    pub fn warning(&self, title: impl Into<String>, body: impl Into<String>) {
        self.show(Severity::Warning, title, body);
    }
}

/// Log a notification at the level matching its severity
fn record(notification: &Notification) {
    match notification.severity {
        Severity::Success | Severity::Info => info!("{}", notification),
        Severity::Warning => warn!("{}", notification),
        Severity::Error => error!("{}", notification),
    }
}

async fn dispatch(mut queue_rx: mpsc::UnboundedReceiver<Queued>, mut display_rx: watch::Receiver<SharedDisplay>) {
    while let Some(Queued {
        notification,
        deadline,
    }) = queue_rx.recv().await
    {
        let current = display_rx.borrow_and_update().clone();
        let display = match current {
            Some(display) => Some(display),
            None => {
                let attached = tokio::time::timeout_at(deadline, async {
                    display_rx
                        .wait_for(Option::is_some)
                        .await
                        .map(|display| display.clone())
                })
                .await;
                match attached {
                    Ok(Ok(display)) => display,
                    _ => None,
                }
            }
        };

        match display {
            Some(display) => display.display(&notification),
            None => warn!("Dropped notification (no display attached): {}", notification),
        }
    }

    debug!("Notification dispatcher exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> NotificationSettings {
        NotificationSettings::default()
    }

    #[tokio::test]
    async fn test_delivered_when_attached() {
        let notifier = Notifier::spawn(&settings());
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        notifier.success("Saved", "Proxy settings saved");

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.severity, Severity::Success);
        assert_eq!(delivered.title, "Saved");
        assert_eq!(delivered.duration, Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let notifier = Notifier::spawn(&settings());
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        notifier.info("one", "");
        notifier.error("two", "");
        notifier.warning("three", "");

        let titles: Vec<String> = vec![
            rx.recv().await.unwrap().title,
            rx.recv().await.unwrap().title,
            rx.recv().await.unwrap().title,
        ];
        assert_eq!(titles, vec!["one", "two", "three"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_before_attach_within_window_is_delivered() {
        let notifier = Notifier::spawn(&settings());

        notifier.info("early", "shown before any display");

        tokio::time::sleep(Duration::from_millis(50)).await;
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.title, "early");
    }

    #[tokio::test(start_paused = true)]
    async fn test_show_without_display_is_dropped_after_window() {
        let notifier = Notifier::spawn(&settings());

        notifier.error("lost", "nobody is listening");

        tokio::time::sleep(Duration::from_millis(500)).await;
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        notifier.info("later", "");
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.title, "later");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_per_notification() {
        let notifier = Notifier::spawn(&settings());

        for i in 0..3 {
            notifier.info(format!("n{}", i), "");
        }

        // All three were shown at once, so all three share one window.
        tokio::time::sleep(Duration::from_millis(80)).await;
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        for i in 0..3 {
            assert_eq!(rx.recv().await.unwrap().title, format!("n{}", i));
        }
    }

    #[tokio::test]
    async fn test_burst_with_display_attached_is_fully_delivered() {
        let notifier = Notifier::spawn(&settings());
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        // No yield in between: the dispatcher cannot drain during the burst.
        for i in 0..200 {
            notifier.info(format!("n{}", i), "");
        }

        for i in 0..200 {
            assert_eq!(rx.recv().await.unwrap().title, format!("n{}", i));
        }
    }

    #[tokio::test]
    async fn test_detach() {
        let notifier = Notifier::spawn(&settings());
        let (display, _rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));
        assert!(notifier.is_attached());

        notifier.detach();
        assert!(!notifier.is_attached());
    }

    #[tokio::test]
    async fn test_custom_duration() {
        let notifier = Notifier::spawn(&settings());
        let (display, mut rx) = ChannelDisplay::new();
        notifier.attach(Arc::new(display));

        notifier.show_for(Severity::Info, "t", "b", Duration::from_secs(10));
        assert_eq!(rx.recv().await.unwrap().duration, Duration::from_secs(10));
    }
}

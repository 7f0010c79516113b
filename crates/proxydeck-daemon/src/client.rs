//! WebSocket transport to the backend bridge
//!
//! [`connect`] opens the socket and spawns a background task that owns it.
//! Requests flow through a [`CommandSender`]: the sender registers an id in
//! the shared [`RequestTracker`] and pushes the serialized frame into a
//! channel; the task writes frames to the socket and routes responses back to
//! the tracker by id.
//!
//! ```text
//!  RpcBackend ──▶ CommandSender ──frame chan──▶ io loop ──▶ WebSocket
//!                      ▲                           │
//!                      └──── RequestTracker ◀──────┘ (responses)
//! ```
//!
//! There is no reconnect. When the socket closes every pending request fails
//! with [`Error::ChannelClosed`] and later requests fail to send.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use proxydeck_core::prelude::*;

use crate::commands::{CommandSender, RequestTracker};
use crate::protocol::{parse_backend_message, BackendMessage};
use crate::rpc::RpcBackend;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the outgoing frame channel
const OUTGOING_CHANNEL_CAPACITY: usize = 32;

/// How often stalled requests are swept from the tracker
const STALE_REQUEST_CLEANUP_INTERVAL: Duration = Duration::from_secs(5);

/// A live connection to the backend bridge
pub struct BackendConnection {
    sender: CommandSender,
    connected: Arc<AtomicBool>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConnection")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Validate a backend URL, accepting only `ws` and `wss`
pub fn parse_backend_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| Error::config_invalid(format!("invalid backend url '{}': {}", raw, e)))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::config_invalid(format!(
            "backend url '{}' must use ws:// or wss://, not {}://",
            raw, other
        ))),
    }
}

/// Connect to the backend bridge at `url`
///
/// `request_timeout` bounds the handshake as well as each later request.
pub async fn connect(url: &str, request_timeout: Duration) -> Result<BackendConnection> {
    let url = parse_backend_url(url)?;

    info!("Connecting to backend at {}", url);

    let (ws_stream, _response) =
        match tokio::time::timeout(request_timeout, connect_async(url.as_str())).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                return Err(Error::transport(format!(
                    "failed to connect to {}: {}",
                    url, e
                )))
            }
            Err(_) => return Err(Error::timeout("connect", request_timeout)),
        };

    let tracker = Arc::new(RequestTracker::new());
    let (outgoing_tx, outgoing_rx) = mpsc::channel::<String>(OUTGOING_CHANNEL_CAPACITY);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let connected = Arc::new(AtomicBool::new(true));

    let task = tokio::spawn(run_io_loop(
        ws_stream,
        outgoing_rx,
        shutdown_rx,
        tracker.clone(),
        connected.clone(),
        request_timeout,
    ));

    info!("Connected to backend");

    Ok(BackendConnection {
        sender: CommandSender::new(outgoing_tx, tracker).with_timeout(request_timeout),
        connected,
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}

impl BackendConnection {
    /// A [`crate::Backend`] that sends over this connection
    pub fn backend(&self) -> RpcBackend {
        RpcBackend::new(self.sender.clone())
    }

    pub fn sender(&self) -> &CommandSender {
        &self.sender
    }

    /// `false` once the socket closed or [`Self::disconnect`] ran
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Close the socket and wait for the I/O task to finish
    pub async fn disconnect(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Backend I/O task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for BackendConnection {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run_io_loop(
    ws_stream: WsStream,
    mut outgoing_rx: mpsc::Receiver<String>,
    mut shutdown_rx: oneshot::Receiver<()>,
    tracker: Arc<RequestTracker>,
    connected: Arc<AtomicBool>,
    request_timeout: Duration,
) {
    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let mut cleanup_interval = tokio::time::interval(STALE_REQUEST_CLEANUP_INTERVAL);
    cleanup_interval.tick().await;

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_ws_text(text.as_str(), &tracker).await;
                    }
                    Some(Ok(WsMessage::Close(_))) => {
                        info!("Backend closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Backend connection error: {}", e);
                        break;
                    }
                    None => {
                        debug!("Backend stream ended");
                        break;
                    }
                }
            }

            outgoing = outgoing_rx.recv() => {
                match outgoing {
                    Some(json) => {
                        if let Err(e) = ws_sink.send(WsMessage::Text(json.into())).await {
                            warn!("Failed to write to backend: {}", e);
                            break;
                        }
                    }
                    None => {
                        send_close(&mut ws_sink).await;
                        break;
                    }
                }
            }

            _ = &mut shutdown_rx => {
                debug!("Disconnecting from backend");
                send_close(&mut ws_sink).await;
                break;
            }

            _ = cleanup_interval.tick() => {
                let stale = tracker.cleanup_stale(request_timeout).await;
                if !stale.is_empty() {
                    debug!("Cleaned up {} stale request(s): {:?}", stale.len(), stale);
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    // Close the frame channel before failing pending requests so nothing new
    // slips in between.
    outgoing_rx.close();
    tracker.cancel_all().await;
    debug!("Backend I/O task exiting");
}

async fn handle_ws_text(text: &str, tracker: &RequestTracker) {
    match parse_backend_message(text) {
        BackendMessage::Response { id, result, error } => {
            if !tracker.handle_response(id, result, error).await {
                debug!("Response for unknown request #{}", id);
            }
        }
        other => debug!("Ignoring backend frame ({})", other.summary()),
    }
}

async fn send_close(ws_sink: &mut SplitSink<WsStream, WsMessage>) {
    let _ = ws_sink.send(WsMessage::Close(None)).await;
    let _ = ws_sink.close().await;
}

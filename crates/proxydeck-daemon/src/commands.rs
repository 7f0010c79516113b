//! Command building and request tracking for backend communication
//!
//! This module provides:
//! - Request ID tracking for matching responses
//! - Command building for JSON-RPC format
//! - Timeout handling for stalled commands

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, RwLock};

use proxydeck_core::prelude::*;
use proxydeck_core::ConfigDocument;

/// Default time to wait for the backend to answer a request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Global request ID counter
static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generate a unique request ID
pub fn next_request_id() -> u64 {
    REQUEST_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A pending request awaiting response
struct PendingRequest {
    /// Channel to send the response
    response_tx: oneshot::Sender<Result<CommandResponse>>,
    /// When this request was created
    created_at: Instant,
    /// Description for logging
    description: String,
}

/// Response from a command
#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub id: u64,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn from_backend_response(id: u64, result: Option<Value>, error: Option<Value>) -> Self {
        Self {
            id,
            success: error.is_none(),
            result,
            error: error.map(|e| error_message(&e)),
        }
    }

    /// Create a success response
    pub fn success(id: u64, result: Option<Value>) -> Self {
        Self {
            id,
            success: true,
            result,
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Convert into the `result` payload, treating an error object as a rejection
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(message) => Err(Error::rejected(message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Pull a readable message out of a JSON-RPC error value
fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

/// Tracks pending requests and matches responses
pub struct RequestTracker {
    /// Map of request ID to pending request
    pending: Arc<RwLock<HashMap<u64, PendingRequest>>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new pending request
    /// Returns (request_id, receiver for response)
    pub async fn register(
        &self,
        description: &str,
    ) -> (u64, oneshot::Receiver<Result<CommandResponse>>) {
        let id = next_request_id();
        let (tx, rx) = oneshot::channel();

        let pending = PendingRequest {
            response_tx: tx,
            created_at: Instant::now(),
            description: description.to_string(),
        };

        self.pending.write().await.insert(id, pending);

        (id, rx)
    }

    /// Handle an incoming response from the backend
    /// Returns true if the response was matched to a pending request
    pub async fn handle_response(
        &self,
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    ) -> bool {
        if let Some(pending) = self.pending.write().await.remove(&id) {
            let response = CommandResponse::from_backend_response(id, result, error);
            let _ = pending.response_tx.send(Ok(response));
            true
        } else {
            false
        }
    }

    /// Fail a single request without waiting for the backend
    pub async fn fail(&self, id: u64, error: Error) -> bool {
        if let Some(pending) = self.pending.write().await.remove(&id) {
            let _ = pending.response_tx.send(Err(error));
            true
        } else {
            false
        }
    }

    /// Fail all pending requests (e.g., the connection dropped)
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.write().await;
        for (id, req) in pending.drain() {
            debug!("Cancelling request #{} ({})", id, req.description);
            let _ = req.response_tx.send(Err(Error::ChannelClosed));
        }
    }

    /// Remove stale requests that have timed out
    pub async fn cleanup_stale(&self, timeout: Duration) -> Vec<u64> {
        let mut pending = self.pending.write().await;
        let now = Instant::now();

        let stale: Vec<u64> = pending
            .iter()
            .filter(|(_, req)| now.duration_since(req.created_at) > timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &stale {
            if let Some(req) = pending.remove(id) {
                let elapsed = now.duration_since(req.created_at);
                let _ = req
                    .response_tx
                    .send(Err(Error::timeout(req.description, elapsed)));
            }
        }

        stale
    }

    /// Get the number of pending requests
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Backend RPC methods
#[derive(Debug, Clone)]
pub enum BackendCommand {
    GetProcessStatus,
    StartProcess,
    StopProcess,
    GetConfigDocument,
    SetConfigDocument { document: Value },
    InstallCertificate,
}

impl BackendCommand {
    /// Build a `SetConfigDocument` command from a typed document
    pub fn set_config(document: &ConfigDocument) -> Result<Self> {
        Ok(BackendCommand::SetConfigDocument {
            document: serde_json::to_value(document)?,
        })
    }

    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            BackendCommand::GetProcessStatus => "App.GetProxyStatus",
            BackendCommand::StartProcess => "App.StartProxy",
            BackendCommand::StopProcess => "App.StopProxy",
            BackendCommand::GetConfigDocument => "Config.GetConfig",
            BackendCommand::SetConfigDocument { .. } => "Config.UpdateConfig",
            BackendCommand::InstallCertificate => "Cert.Install",
        }
    }

    /// Build the JSON-RPC request object
    pub fn build(&self, id: u64) -> String {
        let params = match self {
            BackendCommand::SetConfigDocument { document } => json!([document]),
            _ => json!([]),
        };

        json!({
            "id": id,
            "method": self.method(),
            "params": params,
        })
        .to_string()
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            BackendCommand::GetProcessStatus => "get proxy status",
            BackendCommand::StartProcess => "start proxy",
            BackendCommand::StopProcess => "stop proxy",
            BackendCommand::GetConfigDocument => "get config",
            BackendCommand::SetConfigDocument { .. } => "update config",
            BackendCommand::InstallCertificate => "install certificate",
        }
    }
}

/// Sends commands to the backend with request tracking
#[derive(Clone)]
pub struct CommandSender {
    /// Channel carrying raw JSON frames to the transport
    outgoing_tx: mpsc::Sender<String>,
    /// Request tracker for response matching
    tracker: Arc<RequestTracker>,
    /// Per-request timeout
    timeout: Duration,
}

impl std::fmt::Debug for CommandSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSender")
            .field("outgoing_tx", &"<channel>")
            .field("tracker", &"<tracker>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommandSender {
    pub fn new(outgoing_tx: mpsc::Sender<String>, tracker: Arc<RequestTracker>) -> Self {
        Self {
            outgoing_tx,
            tracker,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &Arc<RequestTracker> {
        &self.tracker
    }

    /// Send a command and wait for response
    pub async fn send(&self, command: BackendCommand) -> Result<CommandResponse> {
        self.send_with_timeout(command, self.timeout).await
    }

    /// Send a command with custom timeout
    pub async fn send_with_timeout(
        &self,
        command: BackendCommand,
        timeout: Duration,
    ) -> Result<CommandResponse> {
        // Register before writing so a fast response always finds its slot
        let (id, response_rx) = self.tracker.register(command.description()).await;

        let json = command.build(id);

        debug!("Sending command #{}: {}", id, command.description());

        if self.outgoing_tx.send(json).await.is_err() {
            self.tracker.fail(id, Error::ChannelClosed).await;
            return Err(Error::channel_send("backend connection"));
        }

        match tokio::time::timeout(timeout, response_rx).await {
            Ok(Ok(Ok(response))) => {
                debug!("Command #{} completed: success={}", id, response.success);
                Ok(response)
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                self.tracker
                    .fail(id, Error::timeout(command.description(), timeout))
                    .await;
                Err(Error::timeout(command.description(), timeout))
            }
        }
    }
}

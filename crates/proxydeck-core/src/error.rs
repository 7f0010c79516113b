//! Application error types with rich context

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend RPC Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Backend unreachable: {message}")]
    Transport { message: String },

    #[error("Backend request '{request}' timed out after {elapsed:?}")]
    Timeout { request: String, elapsed: Duration },

    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },

    #[error("Backend protocol error: {message}")]
    Protocol { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn timeout(request: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            request: request.into(),
            elapsed,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// The RPC could not complete (network or process-boundary failure).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Transport { .. }
                | Error::Timeout { .. }
                | Error::ChannelSend { .. }
                | Error::ChannelClosed
        )
    }

    /// The RPC completed but the backend reported a semantic failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Error::Rejected { .. })
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::transport("connection refused");
        assert_eq!(err.to_string(), "Backend unreachable: connection refused");

        let err = Error::rejected("certificate install returned false");
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_timeout_display_includes_request() {
        let err = Error::timeout("get proxy status", Duration::from_secs(30));
        let text = err.to_string();
        assert!(text.contains("get proxy status"));
        assert!(text.contains("30s"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn test_transport_classification() {
        assert!(Error::transport("down").is_transport());
        assert!(Error::ChannelClosed.is_transport());
        assert!(Error::timeout("x", Duration::ZERO).is_transport());
        assert!(!Error::rejected("no").is_transport());
        assert!(!Error::config("bad").is_transport());
    }

    #[test]
    fn test_rejection_classification() {
        assert!(Error::rejected("no").is_rejection());
        assert!(!Error::transport("down").is_rejection());
        assert!(!Error::protocol("garbled").is_rejection());
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::transport("test");
        let _ = Error::rejected("test");
        let _ = Error::protocol("test");
        let _ = Error::config("test");
        let _ = Error::config_invalid("test");
        let _ = Error::channel_send("test");
    }

    #[test]
    fn test_result_ext_preserves_error() {
        let res: std::result::Result<(), Error> = Err(Error::transport("down"));
        let err = res.context("refreshing status").unwrap_err();
        assert!(err.is_transport());
    }
}

//! The `{success, message}` result every user-triggered command returns

use serde::Serialize;

use crate::error::Error;

/// Outcome of a command, safe to hand to the UI layer
///
/// Backend faults are folded into `success == false` with a readable message;
/// they never escape as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
}

impl CommandOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Failure outcome for `error`, prefixed with what was being attempted
    pub fn from_error(action: &str, error: &Error) -> Self {
        Self::failure(format!("{action}: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let outcome = CommandOutcome::success("Proxy service started");
        assert!(outcome.success);
        assert_eq!(outcome.message, "Proxy service started");
    }

    #[test]
    fn test_failure_from_error() {
        let outcome =
            CommandOutcome::from_error("Failed to start proxy", &Error::transport("refused"));
        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "Failed to start proxy: Backend unreachable: refused"
        );
    }
}

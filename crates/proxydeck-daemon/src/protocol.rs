//! Parsing of frames received from the backend bridge

use serde::Deserialize;
use serde_json::Value;

/// A frame received from the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// Answer to a request we sent
    Response {
        id: u64,
        result: Option<Value>,
        error: Option<Value>,
    },
    /// Unsolicited notification pushed by the backend
    Event { event: String, params: Value },
    /// Anything we could not classify
    Unknown(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMessage {
    Response {
        id: Value,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    Event {
        event: String,
        #[serde(default)]
        params: Value,
    },
}

/// Classify a text frame
///
/// Request ids are numeric on our side; a backend that echoes them back as
/// strings is tolerated.
pub fn parse_backend_message(text: &str) -> BackendMessage {
    let raw: RawMessage = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(_) => return BackendMessage::Unknown(text.to_string()),
    };

    match raw {
        RawMessage::Response { id, result, error } => match parse_id(&id) {
            Some(id) => BackendMessage::Response {
                id,
                result,
                error: error.filter(|e| !e.is_null()),
            },
            None => BackendMessage::Unknown(text.to_string()),
        },
        RawMessage::Event { event, params } => BackendMessage::Event { event, params },
    }
}

fn parse_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl BackendMessage {
    /// Short summary for log lines
    pub fn summary(&self) -> String {
        match self {
            BackendMessage::Response { id, error, .. } => {
                if error.is_some() {
                    format!("Response #{}: error", id)
                } else {
                    format!("Response #{}: ok", id)
                }
            }
            BackendMessage::Event { event, .. } => format!("Event: {}", event),
            BackendMessage::Unknown(raw) => {
                format!("Unknown: {}", truncate_chars(raw, SUMMARY_MAX_CHARS))
            }
        }
    }
}

const SUMMARY_MAX_CHARS: usize = 120;

/// At most `max` characters of `text`, cut on a char boundary
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

//! Domain events emitted by the Engine for external consumers
//!
//! Subscribe with `Engine::subscribe()`. Slow subscribers may miss events
//! (broadcast lag); the latest status is always available from the engine.

use serde::Serialize;

use proxydeck_core::StatusView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A status refresh completed, from the poll timer or a command
    StatusRefreshed { status: StatusView },

    /// A section was written to the backend
    SectionSaved { section: &'static str },

    /// The backend installed the CA certificate
    CertificateInstalled,

    /// Every cached view was discarded and re-derived
    Reloaded { success: bool },

    /// The engine deactivated
    Shutdown,
}

impl EngineEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StatusRefreshed { .. } => "status_refreshed",
            Self::SectionSaved { .. } => "section_saved",
            Self::CertificateInstalled => "certificate_installed",
            Self::Reloaded { .. } => "reloaded",
            Self::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_labels() {
        assert_eq!(EngineEvent::Shutdown.event_type(), "shutdown");
        assert_eq!(
            EngineEvent::SectionSaved { section: "proxy" }.event_type(),
            "section_saved"
        );
    }

    #[test]
    fn test_serializes_with_tag() {
        let value = serde_json::to_value(EngineEvent::SectionSaved { section: "theme" }).unwrap();
        assert_eq!(value["event"], "section_saved");
        assert_eq!(value["section"], "theme");
    }
}

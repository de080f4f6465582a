//! Control message types
//!
//! Control lines start with `$` and carry status text, log-transfer sentinels,
//! mode/state announcements and the SIMP playback trigger.

use serde::{Deserialize, Serialize};

/// Severity of a user-visible log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    /// Ground-side faults the operator should notice but that need no action.
    Warning,
    Error,
}

/// Mode and state carried in a `{MODE|STATE}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionInfo {
    pub mode: String,
    pub state: String,
}

/// Decoded control line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ControlMessage {
    /// `$LOGFILE:BEGIN`, start of a bulk log transfer.
    LogBegin,
    /// `$LOGFILE:END`, end of a bulk log transfer.
    LogEnd,
    StatusEvent {
        text: String,
        severity: Severity,
    },
    ModeStateUpdate {
        mode: String,
        state: String,
        /// Message text with the bracketed payload removed.
        text: String,
        severity: Severity,
    },
    /// Payload asks the ground station to start streaming SIMP lines.
    ///
    /// The same line may also announce a mode change, which has to be applied
    /// before deciding whether playback is allowed.
    SimpBegin {
        mission: Option<MissionInfo>,
        text: String,
        severity: Severity,
    },
}

impl ControlMessage {
    /// Text to show in the operator log, if this message has any.
    pub fn log_text(&self) -> Option<(&str, Severity)> {
        match self {
            ControlMessage::LogBegin | ControlMessage::LogEnd => None,
            ControlMessage::StatusEvent { text, severity }
            | ControlMessage::ModeStateUpdate { text, severity, .. }
            | ControlMessage::SimpBegin { text, severity, .. } => Some((text, *severity)),
        }
    }
}

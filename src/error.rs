//! Error types for the ground station core.
//!
//! Every failure the pipeline can observe is modelled here. None of them are
//! fatal: parse-level errors are recovered inside the router, transport errors
//! turn into a forced link close plus an event, and resource errors abort only
//! the operation that needed the resource.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: empty or malformed telemetry lines
//! - **Field Errors**: a single telemetry field failed to parse (never escapes the codec)
//! - **Transport Errors**: link not open, write failures, device loss
//! - **Resource Errors**: the SIMP playback script could not be loaded
//! - **Protocol Errors**: bulk-transfer sentinels out of place, watchdog expiry
//! - **Rejections**: a command failed admission in the session state machine
//!
//! ## Recovery
//!
//! ```rust
//! use cansat_ground::{GroundStationError, TransportError};
//!
//! let error = GroundStationError::from(TransportError::Disconnected);
//! if error.is_recoverable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::MissionMode;

/// Result type alias for ground station operations.
pub type Result<T, E = GroundStationError> = std::result::Result<T, E>;

/// Failure to turn a received line into a frame or control message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Line was blank, or contained nothing but commas and whitespace.
    #[error("empty line")]
    Empty,

    /// Line could not be interpreted; the whole line is dropped.
    #[error("malformed telemetry line: {reason}")]
    Malformed { reason: String, line: String },
}

impl DecodeError {
    /// Helper constructor for malformed lines.
    pub fn malformed(reason: impl Into<String>, line: impl Into<String>) -> Self {
        DecodeError::Malformed { reason: reason.into(), line: line.into() }
    }
}

/// A single telemetry field that did not parse.
///
/// The codec converts this into `None` for the affected field and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field {field} could not parse {raw:?}")]
pub struct FieldParseError {
    pub field: &'static str,
    pub raw: String,
}

/// Failures at the serial line boundary.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("link is not open")]
    NotOpen,

    #[error("failed to write to link")]
    WriteFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read from link")]
    ReadFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("device disconnected")]
    Disconnected,

    #[error("device not found")]
    DeviceNotFound,
}

impl TransportError {
    /// Whether this failure leaves the link unusable and forces it closed.
    pub fn forces_close(&self) -> bool {
        !matches!(self, TransportError::NotOpen)
    }
}

/// Failures loading external resources.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResourceError {
    #[error("SIMP script {path} could not be read")]
    ScriptMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("SIMP script {path} is {size} bytes, limit is {limit}")]
    ScriptTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("SIMP script {path} is not valid UTF-8")]
    ScriptEncoding { path: PathBuf },
}

/// Violations of the bulk-transfer sub-protocol.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProtocolError {
    /// End sentinel observed with no transfer in progress. Ignored.
    #[error("log end sentinel received while no transfer was active")]
    UnexpectedBulkEnd,

    #[error("log transfer stalled: no line for {idle:?}")]
    BulkTimeout { idle: Duration, lines: u64 },

    #[error("log sink failed after {lines} lines")]
    SinkFailed {
        lines: u64,
        #[source]
        source: std::io::Error,
    },
}

/// Why the session state machine refused a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("open the ground port before sending commands")]
    NotConnected,

    #[error("{command} requires operator confirmation")]
    ConfirmationRequired { command: &'static str },

    #[error("{command} is only valid in {required} mode (currently {actual})")]
    WrongMode { command: &'static str, required: MissionMode, actual: MissionMode },

    #[error("invalid argument: {details}")]
    InvalidArgument { details: String },
}

/// Main error type for ground station operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GroundStationError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("command rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("Configuration error in {context}: {details}")]
    Config { context: String, details: String },

    /// The dispatch task is gone; the handle can no longer reach it.
    #[error("ground station has shut down")]
    Shutdown,
}

impl GroundStationError {
    /// Returns whether the station remains serviceable after this error.
    ///
    /// Configuration errors prevent start-up and a shut-down station stays
    /// down; everything else is handled while running.
    pub fn is_recoverable(&self) -> bool {
        match self {
            GroundStationError::Decode(_) => true,
            GroundStationError::Transport(_) => true,
            GroundStationError::Resource(_) => true,
            GroundStationError::Protocol(_) => true,
            GroundStationError::Rejected(_) => true,
            GroundStationError::Config { .. } => false,
            GroundStationError::Shutdown => false,
        }
    }

    /// Returns suggested operator actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            GroundStationError::Decode(_) => vec![
                "Check the radio link quality",
                "Verify the payload firmware telemetry format",
            ],
            GroundStationError::Transport(TransportError::NotOpen) => {
                vec!["Select a port and open it before sending commands"]
            }
            GroundStationError::Transport(_) => vec![
                "Check the ground radio USB connection",
                "Refresh ports and reopen the link",
            ],
            GroundStationError::Resource(_) => vec![
                "Place the SIMP script next to the executable",
                "Check the script file permissions and encoding",
            ],
            GroundStationError::Protocol(_) => vec![
                "Request the log file again",
                "Keep the payload powered until the transfer completes",
            ],
            GroundStationError::Rejected(_) => vec![
                "Open the link before sending commands",
                "Confirm destructive commands explicitly",
                "Switch the payload to the required mode",
            ],
            GroundStationError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Remove invalid values to fall back to defaults",
            ],
            GroundStationError::Shutdown => vec!["Start a new ground station"],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn config(context: impl Into<String>, details: impl Into<String>) -> Self {
        GroundStationError::Config { context: context.into(), details: details.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn malformed_messages_carry_their_reason(reason in "[a-z ]{1,40}", line in ".*") {
            let err = DecodeError::malformed(reason.clone(), line);
            prop_assert!(err.to_string().contains(&reason));
        }

        #[test]
        fn every_variant_displays_something(details in ".*", idle_ms in 1u64..120_000) {
            let errors: Vec<GroundStationError> = vec![
                DecodeError::Empty.into(),
                TransportError::NotOpen.into(),
                ProtocolError::BulkTimeout { idle: Duration::from_millis(idle_ms), lines: 3 }.into(),
                RejectReason::InvalidArgument { details: details.clone() }.into(),
                GroundStationError::config("config", details),
            ];
            for err in errors {
                prop_assert!(!err.to_string().is_empty());
                prop_assert!(!err.recovery_suggestions().is_empty());
            }
        }
    }

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(GroundStationError::from(TransportError::Disconnected).is_recoverable());
        assert!(GroundStationError::from(ProtocolError::UnexpectedBulkEnd).is_recoverable());
        assert!(!GroundStationError::config("yaml", "bad").is_recoverable());
    }

    #[test]
    fn not_open_does_not_force_close() {
        assert!(!TransportError::NotOpen.forces_close());
        assert!(TransportError::Disconnected.forces_close());
        let io = std::io::Error::other("broken pipe");
        assert!(TransportError::WriteFailed { source: io }.forces_close());
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = GroundStationError::from(ResourceError::ScriptMissing {
            path: PathBuf::from("cansat_2023_simp.txt"),
            source: io,
        });
        // transparent wrapping forwards straight to the io error
        let source = std::error::Error::source(&err);
        assert_eq!(source.map(|s| s.to_string()), Some("no such file".to_string()));
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<GroundStationError>();
    }
}

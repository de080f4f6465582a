//! Core types for the ground station.
//!
//! ## Architecture
//!
//! - [`TelemetryFrame`] is one decoded telemetry line with every optional field typed
//! - [`ControlMessage`] is one decoded `$`-prefixed control line
//! - [`Command`] describes an operator command before it is formatted for the wire
//! - [`TelemetryRecord`] is the fixed-width persistence row derived from a frame or raw line
//! - [`UpdateRate`] controls how often window snapshots are pushed to subscribers
//!
//! ## Usage Example
//!
//! ```rust
//! use cansat_ground::types::{TelemetryFrame, TelemetryRecord, CameraId, CameraState};
//!
//! let mut frame = TelemetryFrame::empty(3114);
//! frame.altitude = Some(512.25);
//! frame.cam_status = Some(3);
//! let frame = frame.stamped(1);
//!
//! assert_eq!(frame.camera_state(CameraId::Camera2), Some(CameraState::On));
//! let record = TelemetryRecord::from_frame(&frame);
//! assert_eq!(record.get("ALTITUDE"), Some("512.25"));
//! ```

mod command;
mod control;
mod frame;
mod record;
mod update_rate;

pub use command::{
    Command, CommandRequest, MAX_SERVO_VALUE, ServoId, SimModeAction, TimeSource,
};
pub use control::{ControlMessage, MissionInfo, Severity};
pub use frame::{Axes, CameraId, CameraState, GpsFix, MissionMode, TelemetryFrame};
pub use record::{RECORD_FIELDS, RecordKind, TelemetryRecord};
pub use update_rate::UpdateRate;

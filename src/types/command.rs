//! Operator command types
//!
//! Every command renders to `CMD,<team_id>,<verb>,<payload>`. Formatting lives
//! in the codec; this module only describes what each command is and which
//! safeguards apply to it.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CameraId;
use crate::session::CommandGroup;

/// Largest value the servo field accepts (three digits).
pub const MAX_SERVO_VALUE: u16 = 999;

/// Servos on the payload that can be programmed from the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServoId {
    /// Camera mount, front.
    Camera,
    /// Probe release clamp, front.
    Release,
    /// Auto-gyro clamp, front.
    Gyro,
    /// Camera gimbal on the gyro, back.
    GyroCamera,
}

impl ServoId {
    pub fn number(self) -> u8 {
        match self {
            ServoId::Camera => 0,
            ServoId::Release => 1,
            ServoId::Gyro => 2,
            ServoId::GyroCamera => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ServoId::Camera => "Camera [CPL3] [F]",
            ServoId::Release => "Release [CLP2] [F]",
            ServoId::Gyro => "Gyro [CPL1] [F]",
            ServoId::GyroCamera => "Gyro [Camera] [B]",
        }
    }
}

/// Simulation mode sub-commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimModeAction {
    Enable,
    Activate,
    Disable,
}

impl SimModeAction {
    fn payload(self) -> &'static str {
        match self {
            SimModeAction::Enable => "ENABLE",
            SimModeAction::Activate => "ACTIVATE",
            SimModeAction::Disable => "DISABLE",
        }
    }
}

/// Where the payload should take its mission clock from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSource {
    /// Payload syncs to its own GPS receiver.
    Gps,
    /// Explicit UTC time of day, `hh:mm:ss`.
    Utc(String),
}

/// A command the operator can send to the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Link check, payload answers with a status message.
    Ping,
    SetTime(TimeSource),
    Restart,
    ProgramServo { servo: ServoId, value: u16 },
    ToggleCamera(CameraId),
    ProbeRelease,
    CameraStatus(CameraId),
    SimMode(SimModeAction),
    CalibrateAltitude,
    /// Ask the payload to stream its stored log file back.
    RetrieveLogs,
    Transmission { on: bool },
    /// One simulated pressure reading from the SIMP script.
    SimPressure(String),
}

impl Command {
    /// Short stable name used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::SetTime(_) => "set-time",
            Command::Restart => "restart",
            Command::ProgramServo { .. } => "program-servo",
            Command::ToggleCamera(_) => "toggle-camera",
            Command::ProbeRelease => "probe-release",
            Command::CameraStatus(_) => "camera-status",
            Command::SimMode(_) => "sim-mode",
            Command::CalibrateAltitude => "calibrate-altitude",
            Command::RetrieveLogs => "retrieve-logs",
            Command::Transmission { on: true } => "transmission-on",
            Command::Transmission { on: false } => "transmission-off",
            Command::SimPressure(_) => "simp",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Command::Ping => "TEST",
            Command::SetTime(_) => "ST",
            Command::Restart => "RR",
            Command::ProgramServo { .. }
            | Command::ToggleCamera(_)
            | Command::ProbeRelease
            | Command::CameraStatus(_) => "MEC",
            Command::SimMode(_) => "SIM",
            Command::CalibrateAltitude => "CAL",
            Command::RetrieveLogs => "GTLOGS",
            Command::Transmission { .. } => "CX",
            Command::SimPressure(_) => "SIMP",
        }
    }

    pub fn payload(&self) -> String {
        match self {
            Command::Ping
            | Command::Restart
            | Command::CalibrateAltitude
            | Command::RetrieveLogs => "X".to_string(),
            Command::SetTime(TimeSource::Gps) => "GPS".to_string(),
            Command::SetTime(TimeSource::Utc(time)) => time.clone(),
            Command::ProgramServo { servo, value } => format!("SERVO:{}|{}", servo.number(), value),
            Command::ToggleCamera(camera) => format!("{}:X", camera.label()),
            Command::ProbeRelease => "RELEASE:X".to_string(),
            Command::CameraStatus(camera) => format!("{}_STAT:X", camera.label()),
            Command::SimMode(action) => action.payload().to_string(),
            Command::Transmission { on } => if *on { "ON" } else { "OFF" }.to_string(),
            Command::SimPressure(value) => value.clone(),
        }
    }

    /// Destructive commands need an explicit operator confirmation.
    pub fn confirm_required(&self) -> bool {
        matches!(
            self,
            Command::Transmission { on: false } | Command::ProbeRelease | Command::RetrieveLogs
        )
    }

    /// Command group whose controls offer this command. SIMP lines come from
    /// playback, not from a control.
    pub fn group(&self) -> Option<CommandGroup> {
        match self {
            Command::Ping => Some(CommandGroup::Connection),
            Command::Restart | Command::Transmission { .. } => Some(CommandGroup::Telemetry),
            Command::SimMode(_) => Some(CommandGroup::Mode),
            Command::RetrieveLogs => Some(CommandGroup::Advanced),
            Command::SetTime(_)
            | Command::ProgramServo { .. }
            | Command::ToggleCamera(_)
            | Command::ProbeRelease
            | Command::CameraStatus(_)
            | Command::CalibrateAltitude => Some(CommandGroup::Sensors),
            Command::SimPressure(_) => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.verb(), self.payload())
    }
}

/// A command together with the operator's confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: Command,
    pub confirmed: bool,
}

impl CommandRequest {
    /// Request the operator has explicitly confirmed.
    pub fn confirmed(command: Command) -> Self {
        Self { command, confirmed: true }
    }
}

impl From<Command> for CommandRequest {
    fn from(command: Command) -> Self {
        Self { command, confirmed: false }
    }
}

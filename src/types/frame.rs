//! Decoded telemetry frame types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating mode of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionMode {
    Flight,
    Sim,
    Unknown,
}

impl MissionMode {
    /// Decode the single-letter mode column of a telemetry line (`F` / `S`).
    pub fn from_wire(code: &str) -> Self {
        match code.trim() {
            "F" => MissionMode::Flight,
            "S" => MissionMode::Sim,
            _ => MissionMode::Unknown,
        }
    }

    /// Decode the long-form mode carried in `{MODE|STATE}` control payloads.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "FLIGHT" => Some(MissionMode::Flight),
            "SIM" => Some(MissionMode::Sim),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MissionMode::Flight => "FLIGHT",
            MissionMode::Sim => "SIM",
            MissionMode::Unknown => "UNKNOWN",
        }
    }

    /// Column text written to persistence records.
    pub fn wire_code(self) -> &'static str {
        match self {
            MissionMode::Flight => "F",
            MissionMode::Sim => "S",
            MissionMode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for MissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Roll / pitch / yaw triple where each axis may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Axes<T> {
    pub r: Option<T>,
    pub p: Option<T>,
    pub y: Option<T>,
}

impl<T: Copy> Axes<T> {
    pub fn new(r: Option<T>, p: Option<T>, y: Option<T>) -> Self {
        Self { r, p, y }
    }

    pub fn to_array(&self) -> [Option<T>; 3] {
        [self.r, self.p, self.y]
    }
}

impl<T: Copy + Into<f64>> Axes<T> {
    /// Channel values ready for a three-line sample window.
    pub fn channels(&self) -> [Option<f64>; 3] {
        self.to_array().map(|axis| axis.map(Into::into))
    }
}

/// GPS block of a telemetry frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GpsFix {
    pub time: Option<String>,
    pub altitude: Option<f64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub sats: Option<String>,
}

impl GpsFix {
    /// Latitude/longitude pair, only when both are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// On-board camera identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraId {
    Camera1,
    Camera2,
}

impl CameraId {
    pub const ALL: [CameraId; 2] = [CameraId::Camera1, CameraId::Camera2];

    pub fn label(self) -> &'static str {
        match self {
            CameraId::Camera1 => "CAMERA1",
            CameraId::Camera2 => "CAMERA2",
        }
    }

    /// Bit of the `CAM_STATUS` column that reports this camera.
    fn status_bit(self) -> i32 {
        match self {
            CameraId::Camera1 => 0b01,
            CameraId::Camera2 => 0b10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraState {
    On,
    Off,
}

impl CameraState {
    pub fn label(self) -> &'static str {
        match self {
            CameraState::On => "ON",
            CameraState::Off => "OFF",
        }
    }
}

/// One decoded telemetry record.
///
/// Only `team_id` and `packet_recv` are always present; every other field is
/// `None` when the payload omitted it or sent something unparseable.
/// `packet_recv` is a ground-side counter stamped by the router, the payload
/// has no say in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryFrame {
    pub team_id: u32,
    pub mission_time: Option<String>,
    pub packet_count: Option<String>,
    pub mode: Option<MissionMode>,
    pub state: Option<String>,
    pub altitude: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub voltage: Option<f64>,
    pub gyro: Axes<i32>,
    pub accel: Axes<i32>,
    pub mag: Axes<f64>,
    pub auto_gyro_rotation_rate: Option<f64>,
    pub gps: GpsFix,
    pub cmd_echo: Option<String>,
    pub cam_status: Option<i32>,
    pub packet_recv: u64,
}

impl TelemetryFrame {
    /// Frame with only the team id set.
    pub fn empty(team_id: u32) -> Self {
        Self {
            team_id,
            mission_time: None,
            packet_count: None,
            mode: None,
            state: None,
            altitude: None,
            temperature: None,
            pressure: None,
            voltage: None,
            gyro: Axes::default(),
            accel: Axes::default(),
            mag: Axes::default(),
            auto_gyro_rotation_rate: None,
            gps: GpsFix::default(),
            cmd_echo: None,
            cam_status: None,
            packet_recv: 0,
        }
    }

    /// Consume the decoded frame and stamp the ground-side receive counter.
    pub fn stamped(self, packet_recv: u64) -> Self {
        Self { packet_recv, ..self }
    }

    /// Camera state reported by the `CAM_STATUS` bitmask.
    ///
    /// 1 = camera 1 on, 2 = camera 2 on, 3 = both. Any other value reads as off.
    pub fn camera_state(&self, camera: CameraId) -> Option<CameraState> {
        let status = self.cam_status?;
        let on = (1..=3).contains(&status) && status & camera.status_bit() != 0;
        Some(if on { CameraState::On } else { CameraState::Off })
    }

    /// Packets the payload claims to have sent, when the column is numeric.
    pub fn reported_packet_count(&self) -> Option<u64> {
        self.packet_count.as_deref().and_then(|count| count.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cam_status_bitmask() {
        let mut frame = TelemetryFrame::empty(3114);
        assert_eq!(frame.camera_state(CameraId::Camera1), None);

        let cases = [
            (0, CameraState::Off, CameraState::Off),
            (1, CameraState::On, CameraState::Off),
            (2, CameraState::Off, CameraState::On),
            (3, CameraState::On, CameraState::On),
            (7, CameraState::Off, CameraState::Off),
            (-1, CameraState::Off, CameraState::Off),
        ];
        for (status, cam1, cam2) in cases {
            frame.cam_status = Some(status);
            assert_eq!(frame.camera_state(CameraId::Camera1), Some(cam1), "status {status}");
            assert_eq!(frame.camera_state(CameraId::Camera2), Some(cam2), "status {status}");
        }
    }

    #[test]
    fn gps_position_needs_both_coordinates() {
        let mut gps = GpsFix { lat: Some(38.15), ..GpsFix::default() };
        assert_eq!(gps.position(), None);
        gps.lon = Some(-79.07);
        assert_eq!(gps.position(), Some((38.15, -79.07)));
    }

    #[test]
    fn mode_codes() {
        assert_eq!(MissionMode::from_wire("F"), MissionMode::Flight);
        assert_eq!(MissionMode::from_wire("S"), MissionMode::Sim);
        assert_eq!(MissionMode::from_wire("X"), MissionMode::Unknown);
        assert_eq!(MissionMode::from_label("SIM"), Some(MissionMode::Sim));
        assert_eq!(MissionMode::from_label("LAUNCH_PAD"), None);
    }

    #[test]
    fn stamping_keeps_payload() {
        let mut frame = TelemetryFrame::empty(1);
        frame.altitude = Some(12.5);
        let stamped = frame.stamped(42);
        assert_eq!(stamped.packet_recv, 42);
        assert_eq!(stamped.altitude, Some(12.5));
    }
}

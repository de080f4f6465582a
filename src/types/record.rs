//! Persistence records
//!
//! The station writes one fixed-width record per decoded frame and one echo
//! record per raw line. Both share the same column layout so a single CSV
//! writer downstream can append either.

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::TelemetryFrame;

/// Column names in write order.
pub const RECORD_FIELDS: [&str; 27] = [
    "TEAM_ID",
    "MISSION_TIME",
    "PACKET_COUNT",
    "MODE",
    "STATE",
    "ALTITUDE",
    "TEMPERATURE",
    "PRESSURE",
    "VOLTAGE",
    "GYRO_R",
    "GYRO_P",
    "GYRO_Y",
    "ACCEL_R",
    "ACCEL_P",
    "ACCEL_Y",
    "MAG_R",
    "MAG_P",
    "MAG_Y",
    "AUTO_GYRO_ROTATION_RATE",
    "GPS_TIME",
    "GPS_ALTITUDE",
    "GPS_LATITUDE",
    "GPS_LONGITUDE",
    "GPS_SATS",
    "CMD_ECHO",
    "CAM_STATUS",
    "PACKET_RECV",
];

const CMD_ECHO_COLUMN: usize = 24;

/// Whether a record came from a decoded frame or is a raw-line echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Frame,
    Echo,
}

/// One row of string-encoded columns, absent values as empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRecord {
    kind: RecordKind,
    columns: [String; RECORD_FIELDS.len()],
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn float(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}

fn int(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl TelemetryRecord {
    /// Record carrying only the raw line in the `CMD_ECHO` column.
    pub fn echo(line: &str) -> Self {
        let mut columns: [String; RECORD_FIELDS.len()] = Default::default();
        columns[CMD_ECHO_COLUMN] = line.to_string();
        Self { kind: RecordKind::Echo, columns }
    }

    pub fn from_frame(frame: &TelemetryFrame) -> Self {
        let columns = [
            frame.team_id.to_string(),
            text(&frame.mission_time),
            text(&frame.packet_count),
            frame.mode.map(|m| m.wire_code().to_string()).unwrap_or_default(),
            text(&frame.state),
            float(frame.altitude),
            float(frame.temperature),
            float(frame.pressure),
            float(frame.voltage),
            int(frame.gyro.r),
            int(frame.gyro.p),
            int(frame.gyro.y),
            int(frame.accel.r),
            int(frame.accel.p),
            int(frame.accel.y),
            float(frame.mag.r),
            float(frame.mag.p),
            float(frame.mag.y),
            float(frame.auto_gyro_rotation_rate),
            text(&frame.gps.time),
            float(frame.gps.altitude),
            float(frame.gps.lat),
            float(frame.gps.lon),
            text(&frame.gps.sats),
            text(&frame.cmd_echo),
            int(frame.cam_status),
            frame.packet_recv.to_string(),
        ];
        Self { kind: RecordKind::Frame, columns }
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Column value by field name.
    pub fn get(&self, field: &str) -> Option<&str> {
        RECORD_FIELDS.iter().position(|name| *name == field).map(|i| self.columns[i].as_str())
    }

    /// Values in [`RECORD_FIELDS`] order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

impl Serialize for TelemetryRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RECORD_FIELDS.len()))?;
        for (name, value) in RECORD_FIELDS.iter().zip(self.columns.iter()) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

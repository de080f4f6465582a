//! Comma-separated telemetry line parsing
//!
//! Firmware may drop trailing columns or send garbage in any of them. Each
//! column is parsed independently: a missing or unparseable column becomes
//! `None` and the rest of the frame survives. Only the team id is mandatory.

use tracing::trace;

use crate::error::{DecodeError, FieldParseError};
use crate::types::{Axes, GpsFix, MissionMode, TelemetryFrame};

/// Number of columns in a complete telemetry line.
pub const TELEMETRY_FIELD_COUNT: usize = 26;

mod index {
    pub const TEAM_ID: usize = 0;
    pub const MISSION_TIME: usize = 1;
    pub const PACKET_COUNT: usize = 2;
    pub const MODE: usize = 3;
    pub const STATE: usize = 4;
    pub const ALTITUDE: usize = 5;
    pub const TEMPERATURE: usize = 6;
    pub const PRESSURE: usize = 7;
    pub const VOLTAGE: usize = 8;
    pub const GYRO: usize = 9;
    pub const ACCEL: usize = 12;
    pub const MAG: usize = 15;
    pub const ROTATION_RATE: usize = 18;
    pub const GPS_TIME: usize = 19;
    pub const GPS_ALTITUDE: usize = 20;
    pub const GPS_LATITUDE: usize = 21;
    pub const GPS_LONGITUDE: usize = 22;
    pub const GPS_SATS: usize = 23;
    pub const CMD_ECHO: usize = 24;
    pub const CAM_STATUS: usize = 25;
}

struct Columns<'a> {
    fields: Vec<&'a str>,
}

impl<'a> Columns<'a> {
    fn new(line: &'a str) -> Self {
        Self { fields: line.split(',').map(str::trim).collect() }
    }

    /// Raw column text; blank columns count as missing.
    fn raw(&self, index: usize) -> Option<&'a str> {
        self.fields.get(index).copied().filter(|field| !field.is_empty())
    }

    fn text(&self, index: usize) -> Option<String> {
        self.raw(index).map(str::to_string)
    }

    fn parsed<T>(
        &self,
        index: usize,
        name: &'static str,
        parse: fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = self.raw(index)?;
        match parse(raw).ok_or_else(|| FieldParseError { field: name, raw: raw.to_string() }) {
            Ok(value) => Some(value),
            Err(err) => {
                trace!("{}", err);
                None
            }
        }
    }

    fn float(&self, index: usize, name: &'static str) -> Option<f64> {
        self.parsed(index, name, parse_float)
    }

    fn int(&self, index: usize, name: &'static str) -> Option<i32> {
        self.parsed(index, name, |raw| raw.parse().ok())
    }

    fn int_axes(&self, start: usize, names: [&'static str; 3]) -> Axes<i32> {
        Axes::new(
            self.int(start, names[0]),
            self.int(start + 1, names[1]),
            self.int(start + 2, names[2]),
        )
    }

    fn float_axes(&self, start: usize, names: [&'static str; 3]) -> Axes<f64> {
        Axes::new(
            self.float(start, names[0]),
            self.float(start + 1, names[1]),
            self.float(start + 2, names[2]),
        )
    }
}

/// `str::parse` is locale independent; non-finite values are not plottable.
fn parse_float(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Decode one telemetry line into a frame with `packet_recv` still unset.
pub(crate) fn parse_telemetry(line: &str) -> Result<TelemetryFrame, DecodeError> {
    let columns = Columns::new(line);

    let team_id = columns
        .raw(index::TEAM_ID)
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or_else(|| DecodeError::malformed("team id is not an unsigned integer", line))?;

    Ok(TelemetryFrame {
        team_id,
        mission_time: columns.text(index::MISSION_TIME),
        packet_count: columns.text(index::PACKET_COUNT),
        mode: columns.raw(index::MODE).map(MissionMode::from_wire),
        state: columns.text(index::STATE),
        altitude: columns.float(index::ALTITUDE, "ALTITUDE"),
        temperature: columns.float(index::TEMPERATURE, "TEMPERATURE"),
        pressure: columns.float(index::PRESSURE, "PRESSURE"),
        voltage: columns.float(index::VOLTAGE, "VOLTAGE"),
        gyro: columns.int_axes(index::GYRO, ["GYRO_R", "GYRO_P", "GYRO_Y"]),
        accel: columns.int_axes(index::ACCEL, ["ACCEL_R", "ACCEL_P", "ACCEL_Y"]),
        mag: columns.float_axes(index::MAG, ["MAG_R", "MAG_P", "MAG_Y"]),
        auto_gyro_rotation_rate: columns
            .float(index::ROTATION_RATE, "AUTO_GYRO_ROTATION_RATE"),
        gps: GpsFix {
            time: columns.text(index::GPS_TIME),
            altitude: columns.float(index::GPS_ALTITUDE, "GPS_ALTITUDE"),
            lat: columns.float(index::GPS_LATITUDE, "GPS_LATITUDE"),
            lon: columns.float(index::GPS_LONGITUDE, "GPS_LONGITUDE"),
            sats: columns.text(index::GPS_SATS),
        },
        cmd_echo: columns.text(index::CMD_ECHO),
        // sent as text, compared as a number downstream
        cam_status: columns.int(index::CAM_STATUS, "CAM_STATUS"),
        packet_recv: 0,
    })
}

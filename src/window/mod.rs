//! Fixed-capacity sample windows feeding the plots.
//!
//! Every window is always full: it is pre-filled at construction, each update
//! evicts the oldest sample, and [`SampleWindow::snapshot`] returns arrays of
//! exactly `capacity` points ready for plotting.
//!
//! - [`ScalarWindow`] is one line against a wall-clock time axis
//! - [`MultiChannelWindow`] is several lines sharing one time axis
//! - [`PairedAxisWindow`] is a track where both coordinates come from data
//!
//! The router owns one [`WindowSet`] with the station's eleven plots.
//!
//! ```rust
//! use cansat_ground::window::{SampleWindow, ScalarWindow};
//!
//! let mut altitude = ScalarWindow::new(4);
//! altitude.update(120.5);
//! let snapshot = altitude.snapshot();
//! assert_eq!(snapshot.y[0], vec![0.0, 0.0, 0.0, 120.5]);
//! assert_eq!(snapshot.x.len(), 4);
//! ```

mod axis;
mod multi;
mod paired;
mod scalar;

pub use multi::MultiChannelWindow;
pub use paired::PairedAxisWindow;
pub use scalar::ScalarWindow;

use serde::Serialize;

/// Common contract of every window shape.
pub trait SampleWindow {
    fn capacity(&self) -> usize;

    /// Re-initialise the buffers and forget elapsed-time memory.
    fn reset(&mut self);

    fn snapshot(&self) -> WindowSnapshot;
}

/// Plot-ready copy of a window: one x axis and one y series per line.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct WindowSnapshot {
    pub x: Vec<f64>,
    pub y: Vec<Vec<f64>>,
}

/// The plots the station keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowId {
    Altitude,
    Temperature,
    Pressure,
    Voltage,
    Gyro,
    /// Per-axis change of the gyro reading between frames.
    GyroRate,
    Accel,
    Magnetometer,
    Rotation,
    GpsTrack,
    GpsAltitude,
}

impl WindowId {
    pub const ALL: [WindowId; 11] = [
        WindowId::Altitude,
        WindowId::Temperature,
        WindowId::Pressure,
        WindowId::Voltage,
        WindowId::Gyro,
        WindowId::GyroRate,
        WindowId::Accel,
        WindowId::Magnetometer,
        WindowId::Rotation,
        WindowId::GpsTrack,
        WindowId::GpsAltitude,
    ];

    pub fn title(self) -> &'static str {
        match self {
            WindowId::Altitude => "Altitude",
            WindowId::Temperature => "Temperature",
            WindowId::Pressure => "Pressure",
            WindowId::Voltage => "Voltage",
            WindowId::Gyro => "Gyro",
            WindowId::GyroRate => "Gyro Rate",
            WindowId::Accel => "Acceleration",
            WindowId::Magnetometer => "Magnetometer",
            WindowId::Rotation => "Auto-Gyro Rotation",
            WindowId::GpsTrack => "GPS",
            WindowId::GpsAltitude => "GPS Altitude",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            WindowId::Altitude | WindowId::GpsAltitude => "m",
            WindowId::Temperature => "°C",
            WindowId::Pressure => "kPa",
            WindowId::Voltage => "V",
            WindowId::Gyro | WindowId::Rotation => "deg/s",
            WindowId::GyroRate => "deg/s²",
            WindowId::Accel => "m/s²",
            WindowId::Magnetometer => "G",
            WindowId::GpsTrack => "deg",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// The eleven windows owned by the router.
#[derive(Debug, Clone)]
pub struct WindowSet {
    pub(crate) altitude: ScalarWindow,
    pub(crate) temperature: ScalarWindow,
    pub(crate) pressure: ScalarWindow,
    pub(crate) voltage: ScalarWindow,
    pub(crate) gyro: MultiChannelWindow,
    pub(crate) gyro_rate: MultiChannelWindow,
    pub(crate) accel: MultiChannelWindow,
    pub(crate) mag: MultiChannelWindow,
    pub(crate) rotation: ScalarWindow,
    pub(crate) gps_track: PairedAxisWindow,
    pub(crate) gps_altitude: ScalarWindow,
}

impl WindowSet {
    pub fn new(capacity: usize, gps_origin: (f64, f64)) -> Self {
        Self {
            altitude: ScalarWindow::new(capacity),
            temperature: ScalarWindow::new(capacity),
            pressure: ScalarWindow::new(capacity),
            voltage: ScalarWindow::new(capacity),
            gyro: MultiChannelWindow::new(capacity, 3),
            gyro_rate: MultiChannelWindow::new(capacity, 3),
            accel: MultiChannelWindow::new(capacity, 3),
            mag: MultiChannelWindow::new(capacity, 3),
            rotation: ScalarWindow::new(capacity),
            gps_track: PairedAxisWindow::new(capacity, gps_origin),
            gps_altitude: ScalarWindow::new(capacity),
        }
    }

    pub fn get(&self, id: WindowId) -> &dyn SampleWindow {
        match id {
            WindowId::Altitude => &self.altitude,
            WindowId::Temperature => &self.temperature,
            WindowId::Pressure => &self.pressure,
            WindowId::Voltage => &self.voltage,
            WindowId::Gyro => &self.gyro,
            WindowId::GyroRate => &self.gyro_rate,
            WindowId::Accel => &self.accel,
            WindowId::Magnetometer => &self.mag,
            WindowId::Rotation => &self.rotation,
            WindowId::GpsTrack => &self.gps_track,
            WindowId::GpsAltitude => &self.gps_altitude,
        }
    }

    fn get_mut(&mut self, id: WindowId) -> &mut dyn SampleWindow {
        match id {
            WindowId::Altitude => &mut self.altitude,
            WindowId::Temperature => &mut self.temperature,
            WindowId::Pressure => &mut self.pressure,
            WindowId::Voltage => &mut self.voltage,
            WindowId::Gyro => &mut self.gyro,
            WindowId::GyroRate => &mut self.gyro_rate,
            WindowId::Accel => &mut self.accel,
            WindowId::Magnetometer => &mut self.mag,
            WindowId::Rotation => &mut self.rotation,
            WindowId::GpsTrack => &mut self.gps_track,
            WindowId::GpsAltitude => &mut self.gps_altitude,
        }
    }

    pub fn reset_all(&mut self) {
        for id in WindowId::ALL {
            self.get_mut(id).reset();
        }
    }

    pub fn snapshot(&self, id: WindowId) -> WindowSnapshot {
        self.get(id).snapshot()
    }

    pub fn snapshot_all(&self) -> SnapshotSet {
        SnapshotSet { windows: WindowId::ALL.map(|id| self.snapshot(id)) }
    }
}

/// Snapshot of every window at one point in the stream.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SnapshotSet {
    windows: [WindowSnapshot; 11],
}

impl SnapshotSet {
    pub fn get(&self, id: WindowId) -> &WindowSnapshot {
        &self.windows[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &WindowSnapshot)> {
        WindowId::ALL.into_iter().zip(self.windows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_window_starts_at_capacity() {
        let set = WindowSet::new(16, (38.149574, 79.0737));
        let snapshots = set.snapshot_all();
        for (id, snapshot) in snapshots.iter() {
            assert_eq!(set.get(id).capacity(), 16, "{}", id.title());
            assert_eq!(snapshot.x.len(), 16, "{}", id.title());
            assert!(snapshot.y.iter().all(|line| line.len() == 16), "{}", id.title());
        }
        assert_eq!(snapshots.get(WindowId::Gyro).y.len(), 3);
        assert_eq!(snapshots.get(WindowId::GpsTrack).x[0], 38.149574);
    }

    #[test]
    fn reset_all_rezeros_series_but_keeps_track_position() {
        let mut set = WindowSet::new(4, (0.0, 0.0));
        set.altitude.update(100.0);
        set.accel.update(&[Some(1.0), Some(2.0), Some(3.0)]);
        set.gps_track.update(38.2, -79.1);

        set.reset_all();
        let snapshots = set.snapshot_all();
        assert_eq!(snapshots.get(WindowId::Altitude).y[0], vec![0.0; 4]);
        assert!(snapshots.get(WindowId::Accel).y.iter().flatten().all(|v| *v == 0.0));
        assert_eq!(snapshots.get(WindowId::GpsTrack).x, vec![38.2; 4]);
    }

    #[test]
    fn ids_index_in_declaration_order() {
        for (i, id) in WindowId::ALL.into_iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }
}

//! Telemetry router
//!
//! The router owns all mutable ground-station state: the session, the plot
//! windows, the bulk transfer and the SIMP playback. Every input (a received
//! line, an operator request, a tick) is processed to completion and yields a
//! batch of [`RouterEvent`]s for the outside world. Nothing in here blocks or
//! performs link I/O; writes are requested through [`RouterEvent::Transmit`].

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::bulk::{BulkProgress, BulkTransferSession, SinkFactory};
use crate::codec::{Decoded, FrameCodec};
use crate::config::StationConfig;
use crate::error::{DecodeError, ProtocolError, RejectReason, TransportError};
use crate::session::{
    AdmittedCommand, CommandGroup, ConnectionState, Counters, GroupTransition, SessionState,
    SimpPlayback, SimpScript,
};
use crate::types::{
    CameraId, CameraState, Command, CommandRequest, ControlMessage, MissionInfo, MissionMode,
    Severity, TelemetryFrame, TelemetryRecord,
};
use crate::window::{SnapshotSet, WindowId, WindowSet, WindowSnapshot};

/// Record columns forwarded to the live readouts after every frame.
const LIVE_FIELDS: [&str; 15] = [
    "MISSION_TIME",
    "PACKET_COUNT",
    "MODE",
    "STATE",
    "ALTITUDE",
    "TEMPERATURE",
    "PRESSURE",
    "VOLTAGE",
    "AUTO_GYRO_ROTATION_RATE",
    "GPS_TIME",
    "GPS_ALTITUDE",
    "GPS_LATITUDE",
    "GPS_LONGITUDE",
    "GPS_SATS",
    "CMD_ECHO",
];

/// Side effects requested by the router.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    /// Line for the operator log.
    Log { text: String, severity: Severity },
    /// Row for the persistence collaborator.
    Persist(TelemetryRecord),
    /// A decoded telemetry frame, already stamped with its receive number.
    Frame(Box<TelemetryFrame>),
    LiveValue { field: &'static str, value: String },
    CameraStatus { camera: CameraId, state: CameraState },
    /// Mode and state announced by the payload.
    MissionStatus { mode: String, state: String },
    /// A window changed and can be redrawn.
    Redraw(WindowId),
    WindowsReset,
    PacketCounts(Counters),
    Connection(ConnectionState),
    GroupChanged(GroupTransition),
    TeamId(u32),
    MissionReset,
    TransferStarted,
    TransferProgress { lines: u64 },
    TransferComplete { lines: u64 },
    TransferAborted { lines: u64 },
    SimpStarted { lines: usize },
    SimpFinished { sent: usize },
    SimpStopped,
    /// Admitted command waiting to be written to the link.
    Transmit(AdmittedCommand),
    /// Command refused by the session state machine.
    Rejected(RejectReason),
}

impl RouterEvent {
    fn log(text: impl Into<String>, severity: Severity) -> Self {
        RouterEvent::Log { text: text.into(), severity }
    }

    fn info(text: impl Into<String>) -> Self {
        Self::log(text, Severity::Info)
    }

    fn warning(text: impl Into<String>) -> Self {
        Self::log(text, Severity::Warning)
    }

    fn error(text: impl Into<String>) -> Self {
        Self::log(text, Severity::Error)
    }

    /// Severity when this event is something the operator should read.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            RouterEvent::Log { severity, .. } => Some(*severity),
            RouterEvent::Rejected(_) => Some(Severity::Error),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Some(Severity::Error)
    }
}

impl From<RejectReason> for RouterEvent {
    fn from(reason: RejectReason) -> Self {
        RouterEvent::Rejected(reason)
    }
}

/// Events produced by one router call, in emission order.
#[derive(Debug)]
pub struct RouterEvents(std::vec::IntoIter<RouterEvent>);

impl Iterator for RouterEvents {
    type Item = RouterEvent;

    fn next(&mut self) -> Option<RouterEvent> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for RouterEvents {}

impl From<Vec<RouterEvent>> for RouterEvents {
    fn from(events: Vec<RouterEvent>) -> Self {
        RouterEvents(events.into_iter())
    }
}

/// Orchestrates codec, windows, session, bulk transfer and SIMP playback.
#[derive(Debug)]
pub struct TelemetryRouter {
    session: SessionState,
    windows: WindowSet,
    bulk: BulkTransferSession,
    simp: SimpPlayback,
    simp_script: PathBuf,
    simp_max_bytes: u64,
    /// Last gyro reading per axis, for the rate-of-change channel.
    last_gyro: [f64; 3],
}

impl TelemetryRouter {
    pub fn new(config: &StationConfig, sinks: Box<dyn SinkFactory>) -> Self {
        Self {
            session: SessionState::new(config.team_id),
            windows: WindowSet::new(config.window_capacity, config.gps_origin()),
            bulk: BulkTransferSession::new(sinks, config.bulk_timeout()),
            simp: SimpPlayback::new(),
            simp_script: config.simp_script.clone(),
            simp_max_bytes: config.simp_max_bytes,
            last_gyro: [0.0; 3],
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn windows(&self) -> &WindowSet {
        &self.windows
    }

    pub fn snapshot(&self, window: WindowId) -> WindowSnapshot {
        self.windows.snapshot(window)
    }

    pub fn snapshot_all(&self) -> SnapshotSet {
        self.windows.snapshot_all()
    }

    pub fn is_bulk_active(&self) -> bool {
        self.bulk.is_active()
    }

    pub fn simp_running(&self) -> bool {
        self.simp.is_running()
    }

    /// Route one received line.
    pub fn ingest(&mut self, line: &str) -> RouterEvents {
        self.ingest_at(line, Instant::now())
    }

    /// Route one received line observed at `now`.
    pub fn ingest_at(&mut self, line: &str, now: Instant) -> RouterEvents {
        let mut events = Vec::new();
        trace!(line, "Received line");

        if self.bulk.is_active() {
            self.feed_bulk(line, now, &mut events);
            return events.into();
        }

        match FrameCodec::decode(line) {
            Err(DecodeError::Empty) => {}
            Err(err @ DecodeError::Malformed { .. }) => {
                warn!("Dropping line: {}", err);
                events.push(RouterEvent::Persist(TelemetryRecord::echo(line)));
                events.push(RouterEvent::warning(err.to_string()));
            }
            Ok(Decoded::Control(ControlMessage::LogBegin)) => self.begin_bulk(line, now, &mut events),
            Ok(Decoded::Control(message)) => self.route_control(line, message, &mut events),
            Ok(Decoded::Telemetry(frame)) => {
                events.push(RouterEvent::Persist(TelemetryRecord::echo(line)));
                self.route_frame(frame, now, &mut events);
            }
        }

        events.into()
    }

    fn begin_bulk(&mut self, line: &str, now: Instant, events: &mut Vec<RouterEvent>) {
        match self.bulk.begin(line, now) {
            Ok(_) => events.push(RouterEvent::TransferStarted),
            Err(err) => {
                error!("Could not start log transfer: {}", err);
                events.push(RouterEvent::error(err.to_string()));
            }
        }
    }

    fn feed_bulk(&mut self, line: &str, now: Instant, events: &mut Vec<RouterEvent>) {
        match self.bulk.accept(line, now) {
            Ok(BulkProgress::Stored { lines }) => {
                events.push(RouterEvent::TransferProgress { lines });
            }
            Ok(BulkProgress::Completed { lines }) => {
                events.push(RouterEvent::TransferComplete { lines });
                events.push(RouterEvent::info("Finished uploading log data"));
            }
            Err(err) => {
                error!("Log transfer failed: {}", err);
                events.push(RouterEvent::TransferAborted { lines: self.bulk.lines() });
                events.push(RouterEvent::error(err.to_string()));
            }
        }
    }

    fn route_control(&mut self, line: &str, message: ControlMessage, events: &mut Vec<RouterEvent>) {
        Self::camera_mentions(line, events);
        events.push(RouterEvent::Persist(TelemetryRecord::echo(line)));

        match message {
            ControlMessage::LogBegin => {}
            ControlMessage::LogEnd => {
                debug!("Ignoring log end: {}", ProtocolError::UnexpectedBulkEnd);
            }
            ControlMessage::StatusEvent { text, severity } => {
                events.push(RouterEvent::log(text, severity));
            }
            ControlMessage::ModeStateUpdate { mode, state, text, severity } => {
                self.apply_mission(MissionInfo { mode, state }, events);
                events.push(RouterEvent::log(text, severity));
            }
            ControlMessage::SimpBegin { mission, text, severity } => {
                if let Some(mission) = mission {
                    self.apply_mission(mission, events);
                }
                events.push(RouterEvent::log(text, severity));
                self.start_simp(events);
            }
        }
    }

    /// Status text such as `CAMERA1 ON` updates the camera indicators.
    fn camera_mentions(line: &str, events: &mut Vec<RouterEvent>) {
        for state in [CameraState::On, CameraState::Off] {
            for camera in CameraId::ALL {
                let needle = format!("{} {}", camera.label(), state.label());
                if line.contains(&needle) {
                    events.push(RouterEvent::CameraStatus { camera, state });
                }
            }
        }
    }

    fn apply_mission(&mut self, mission: MissionInfo, events: &mut Vec<RouterEvent>) {
        match MissionMode::from_label(&mission.mode) {
            Some(mode) => self.session.set_operating_mode(mode),
            None => warn!("Unknown payload mode {:?}, keeping {}", mission.mode, self.session.operating_mode()),
        }
        events.push(RouterEvent::MissionStatus { mode: mission.mode, state: mission.state });
    }

    fn start_simp(&mut self, events: &mut Vec<RouterEvent>) {
        if self.session.operating_mode() != MissionMode::Sim {
            debug!("Ignoring SIMP request outside SIM mode");
            return;
        }

        match SimpScript::load(&self.simp_script, self.simp_max_bytes) {
            Ok(script) => {
                let lines = script.len();
                self.simp.start(script);
                events.push(RouterEvent::SimpStarted { lines });
            }
            Err(err) => {
                warn!("SIMP playback not started: {}", err);
                events.push(RouterEvent::warning(format!("Could not load SIMP data: {err}")));
            }
        }
    }

    fn route_frame(&mut self, frame: TelemetryFrame, now: Instant, events: &mut Vec<RouterEvent>) {
        let recv = self.session.record_received();
        let frame = frame.stamped(recv);
        if let Some(sent) = frame.reported_packet_count() {
            self.session.set_sent(sent);
        }
        events.push(RouterEvent::PacketCounts(self.session.counters()));

        self.update_windows(&frame, now, events);

        for camera in CameraId::ALL {
            if let Some(state) = frame.camera_state(camera) {
                events.push(RouterEvent::CameraStatus { camera, state });
            }
        }

        let record = TelemetryRecord::from_frame(&frame);
        for field in LIVE_FIELDS {
            if let Some(value) = record.get(field).filter(|v| !v.is_empty()) {
                events.push(RouterEvent::LiveValue { field, value: value.to_string() });
            }
        }
        events.push(RouterEvent::Persist(record));
        events.push(RouterEvent::Frame(Box::new(frame)));
    }

    fn update_windows(&mut self, frame: &TelemetryFrame, now: Instant, events: &mut Vec<RouterEvent>) {
        let windows = &mut self.windows;
        let mut redraw = |id| events.push(RouterEvent::Redraw(id));

        let scalars = [
            (frame.altitude, WindowId::Altitude),
            (frame.temperature, WindowId::Temperature),
            (frame.pressure, WindowId::Pressure),
            (frame.voltage, WindowId::Voltage),
            (frame.auto_gyro_rotation_rate, WindowId::Rotation),
            (frame.gps.altitude, WindowId::GpsAltitude),
        ];
        for (value, id) in scalars {
            let Some(value) = value else { continue };
            let window = match id {
                WindowId::Altitude => &mut windows.altitude,
                WindowId::Temperature => &mut windows.temperature,
                WindowId::Pressure => &mut windows.pressure,
                WindowId::Voltage => &mut windows.voltage,
                WindowId::Rotation => &mut windows.rotation,
                _ => &mut windows.gps_altitude,
            };
            window.update_at(value, now);
            redraw(id);
        }

        let gyro = frame.gyro.channels();
        let mut gyro_rate = [None; 3];
        for (axis, value) in gyro.iter().enumerate() {
            if let Some(value) = value {
                gyro_rate[axis] = Some(value - self.last_gyro[axis]);
                self.last_gyro[axis] = *value;
            }
        }

        let vectors = [
            (gyro, WindowId::Gyro),
            (gyro_rate, WindowId::GyroRate),
            (frame.accel.channels(), WindowId::Accel),
            (frame.mag.channels(), WindowId::Magnetometer),
        ];
        for (channels, id) in vectors {
            if channels.iter().all(Option::is_none) {
                continue;
            }
            let window = match id {
                WindowId::Gyro => &mut windows.gyro,
                WindowId::GyroRate => &mut windows.gyro_rate,
                WindowId::Accel => &mut windows.accel,
                _ => &mut windows.mag,
            };
            window.update_at(&channels, now);
            redraw(id);
        }

        if let Some((lat, lon)) = frame.gps.position() {
            windows.gps_track.update(lat, lon);
            redraw(WindowId::GpsTrack);
        }
    }

    /// Gate an operator request. An admitted command comes back as
    /// [`RouterEvent::Transmit`]; a refused one as a single
    /// [`RouterEvent::Rejected`].
    pub fn submit(&mut self, request: impl Into<CommandRequest>) -> RouterEvents {
        let event = match self.session.try_admit(request) {
            Ok(admitted) => {
                debug!(command = admitted.command.name(), "Command admitted");
                RouterEvent::Transmit(admitted)
            }
            Err(reason) => {
                warn!("Command rejected: {}", reason);
                RouterEvent::Rejected(reason)
            }
        };
        vec![event].into()
    }

    /// Apply the effects of a command the transport accepted.
    pub fn confirm_sent(&mut self, admitted: &AdmittedCommand) -> RouterEvents {
        let mut events = Vec::new();
        let sim = self.session.operating_mode() == MissionMode::Sim;

        match &admitted.command {
            Command::SimPressure(_) => {
                let (sent, total) = self.simp.progress();
                trace!(sent, total, "Sent SIMP line");
            }
            Command::Transmission { on: true } => {
                self.session.set_transmission(true);
                self.session.reset_received();
                self.windows.reset_all();
                events.push(RouterEvent::info("Sent transmission on command"));
                events.push(RouterEvent::WindowsReset);
                events.push(RouterEvent::PacketCounts(self.session.counters()));
                // rewound; the payload restarts playback with BEGIN_SIMP
                if sim && self.simp.stop() {
                    events.push(RouterEvent::SimpStopped);
                }
            }
            Command::Transmission { on: false } => {
                self.session.set_transmission(false);
                events.push(RouterEvent::info("Sent transmission off command"));
                if sim && self.simp.stop() {
                    events.push(RouterEvent::SimpStopped);
                }
            }
            Command::RetrieveLogs => {
                events.push(RouterEvent::info("Attempting to retrieve log data"));
            }
            command => {
                events.push(RouterEvent::info(format!("Sent {}", command)));
            }
        }

        events.into()
    }

    /// The transport refused an admitted command.
    pub fn send_failed(&mut self, admitted: &AdmittedCommand, err: TransportError) -> RouterEvents {
        error!(command = admitted.command.name(), "Cannot send data: {}", err);
        let mut events = vec![RouterEvent::error(format!("Cannot send data - {err}"))];
        if err.forces_close() {
            self.force_close(&mut events);
        }
        events.into()
    }

    /// The transport failed while reading.
    pub fn transport_error(&mut self, err: TransportError) -> RouterEvents {
        error!("Serial error: {}", err);
        let mut events = vec![RouterEvent::error(format!("Serial error: {err}"))];
        if err.forces_close() {
            self.force_close(&mut events);
        }
        events.into()
    }

    /// Produce the next SIMP line, or finish playback when the script is
    /// exhausted or the line is no longer admissible.
    pub fn next_simp_line(&mut self) -> RouterEvents {
        if !self.simp.is_running() {
            return Vec::new().into();
        }

        let Some(command) = self.simp.next_command() else {
            let (sent, _) = self.simp.progress();
            info!("SIMP playback finished after {} lines", sent);
            return vec![RouterEvent::SimpFinished { sent }].into();
        };

        match self.session.try_admit(command) {
            Ok(admitted) => vec![RouterEvent::Transmit(admitted)].into(),
            Err(reason) => {
                warn!("Stopping SIMP playback: {}", reason);
                self.simp.stop();
                vec![RouterEvent::Rejected(reason), RouterEvent::SimpStopped].into()
            }
        }
    }

    /// Run the bulk-transfer watchdog.
    pub fn check_timeouts(&mut self, now: Instant) -> RouterEvents {
        match self.bulk.check_timeout(now) {
            Some(err @ ProtocolError::BulkTimeout { lines, .. }) => vec![
                RouterEvent::TransferAborted { lines },
                RouterEvent::error(err.to_string()),
            ]
            .into(),
            Some(err) => vec![RouterEvent::error(err.to_string())].into(),
            None => Vec::new().into(),
        }
    }

    pub fn open_link(&mut self) -> RouterEvents {
        if !self.session.open() {
            return vec![RouterEvent::info("Ground port already open")].into();
        }
        info!("Ground port opened");
        vec![RouterEvent::Connection(ConnectionState::Open), RouterEvent::info("Ground port opened")]
            .into()
    }

    /// Close the link. Stops SIMP playback and aborts an unfinished log
    /// transfer.
    pub fn close_link(&mut self) -> RouterEvents {
        let mut events = Vec::new();
        if !self.session.is_open() {
            events.push(RouterEvent::info("Ground port already closed"));
            return events.into();
        }
        self.shutdown_link(&mut events);
        events.push(RouterEvent::info("Ground port was closed"));
        events.into()
    }

    fn force_close(&mut self, events: &mut Vec<RouterEvent>) {
        if self.session.is_open() {
            warn!("Forcing ground port closed");
            self.shutdown_link(events);
        }
    }

    fn shutdown_link(&mut self, events: &mut Vec<RouterEvent>) {
        if self.bulk.is_active() {
            let lines = self.bulk.abort();
            events.push(RouterEvent::TransferAborted { lines });
            events.push(RouterEvent::warning(format!(
                "Log transfer aborted after {lines} lines"
            )));
        }
        if self.simp.stop() {
            events.push(RouterEvent::SimpStopped);
        }
        self.session.close();
        info!("Ground port closed");
        events.push(RouterEvent::Connection(ConnectionState::Closed));
    }

    pub fn set_team_id(&mut self, team_id: u32) -> RouterEvents {
        if !self.session.set_team_id(team_id) {
            return Vec::new().into();
        }
        info!(team_id, "Team id updated");
        vec![
            RouterEvent::TeamId(team_id),
            RouterEvent::info(format!("Updated ground station TEAM ID to '{team_id}'")),
        ]
        .into()
    }

    pub fn enter_group(&mut self, group: CommandGroup) -> RouterEvents {
        self.session.enter_group(group).map(RouterEvent::GroupChanged).into_iter().collect::<Vec<_>>().into()
    }

    /// Clear plots and counters for a new mission.
    pub fn reset_mission(&mut self) -> RouterEvents {
        info!("Mission reset");
        self.windows.reset_all();
        self.session.reset_counters();
        vec![
            RouterEvent::WindowsReset,
            RouterEvent::PacketCounts(self.session.counters()),
            RouterEvent::MissionReset,
        ]
        .into()
    }
}

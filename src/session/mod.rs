//! Mode and command state machine.
//!
//! [`SessionState`] tracks what the ground station believes about the link
//! and the payload: operating mode, which command group the operator is
//! looking at, whether the port is open, whether telemetry transmission was
//! switched on, the team id and the packet counters.
//!
//! Commands pass through [`SessionState::try_admit`] before they are
//! formatted. A rejected command is never written to the link.

mod simp;

pub use simp::{SIMP_PLACEHOLDER_PREFIX, SimpPlayback, SimpScript};

use serde::Serialize;
use tracing::debug;

use crate::codec::FrameCodec;
use crate::error::RejectReason;
use crate::types::{Command, CommandRequest, MAX_SERVO_VALUE, MissionMode};

/// Groups of operator controls. Only one group is visible at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CommandGroup {
    Main,
    Mode,
    Advanced,
    Sensors,
    Connection,
    Telemetry,
}

impl CommandGroup {
    pub fn label(self) -> &'static str {
        match self {
            CommandGroup::Main => "MAIN",
            CommandGroup::Mode => "MODE",
            CommandGroup::Advanced => "ADVANCED",
            CommandGroup::Sensors => "SENSORS",
            CommandGroup::Connection => "CONNECTION",
            CommandGroup::Telemetry => "TELEMETRY",
        }
    }
}

/// Controls to hide and controls to show after a group change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupTransition {
    pub hide: CommandGroup,
    pub show: CommandGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransmissionState {
    On,
    Off,
}

/// Packets received by the ground station and packets the payload reports
/// having sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Counters {
    pub recv: u64,
    pub sent: u64,
}

/// A command that passed admission, already formatted for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedCommand {
    pub command: Command,
    pub line: String,
}

/// Ground-side view of the mission.
#[derive(Debug, Clone)]
pub struct SessionState {
    operating_mode: MissionMode,
    active_group: CommandGroup,
    connection: ConnectionState,
    transmission: TransmissionState,
    team_id: u32,
    counters: Counters,
}

impl SessionState {
    /// Fresh session: flight mode, main controls, port closed.
    pub fn new(team_id: u32) -> Self {
        Self {
            operating_mode: MissionMode::Flight,
            active_group: CommandGroup::Main,
            connection: ConnectionState::Closed,
            transmission: TransmissionState::Off,
            team_id,
            counters: Counters::default(),
        }
    }

    pub fn operating_mode(&self) -> MissionMode {
        self.operating_mode
    }

    pub fn set_operating_mode(&mut self, mode: MissionMode) {
        if self.operating_mode != mode {
            debug!("Operating mode {} -> {}", self.operating_mode, mode);
            self.operating_mode = mode;
        }
    }

    pub fn active_group(&self) -> CommandGroup {
        self.active_group
    }

    /// Switch the visible command group.
    ///
    /// The active group is hidden and the target shown; re-entering the
    /// active group changes nothing. Going back always means entering `Main`;
    /// there is no stack of visited groups.
    pub fn enter_group(&mut self, target: CommandGroup) -> Option<GroupTransition> {
        if target == self.active_group {
            return None;
        }
        let transition = GroupTransition { hide: self.active_group, show: target };
        debug!("Command group {} -> {}", transition.hide.label(), transition.show.label());
        self.active_group = target;
        Some(transition)
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_open(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    /// Mark the link open. Returns `false` when it already was.
    pub fn open(&mut self) -> bool {
        let changed = self.connection == ConnectionState::Closed;
        self.connection = ConnectionState::Open;
        changed
    }

    /// Mark the link closed. Returns `false` when it already was.
    pub fn close(&mut self) -> bool {
        let changed = self.connection == ConnectionState::Open;
        self.connection = ConnectionState::Closed;
        changed
    }

    pub fn transmission(&self) -> TransmissionState {
        self.transmission
    }

    pub(crate) fn set_transmission(&mut self, on: bool) {
        self.transmission = if on { TransmissionState::On } else { TransmissionState::Off };
    }

    pub fn team_id(&self) -> u32 {
        self.team_id
    }

    /// Returns `false` when the id did not change.
    pub fn set_team_id(&mut self, team_id: u32) -> bool {
        let changed = self.team_id != team_id;
        self.team_id = team_id;
        changed
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Count one received frame and return its receive number.
    pub(crate) fn record_received(&mut self) -> u64 {
        self.counters.recv += 1;
        self.counters.recv
    }

    pub(crate) fn set_sent(&mut self, sent: u64) {
        self.counters.sent = sent;
    }

    pub(crate) fn reset_received(&mut self) {
        self.counters.recv = 0;
    }

    pub(crate) fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }

    /// Gate a command and format it for the wire.
    ///
    /// Checks run in a fixed order: link open, operator confirmation, mode,
    /// argument range.
    pub fn try_admit(
        &self,
        request: impl Into<CommandRequest>,
    ) -> Result<AdmittedCommand, RejectReason> {
        let CommandRequest { command, confirmed } = request.into();

        if !self.is_open() {
            return Err(RejectReason::NotConnected);
        }

        if command.confirm_required() && !confirmed {
            return Err(RejectReason::ConfirmationRequired { command: command.name() });
        }

        if matches!(command, Command::SimPressure(_)) && self.operating_mode != MissionMode::Sim {
            return Err(RejectReason::WrongMode {
                command: command.name(),
                required: MissionMode::Sim,
                actual: self.operating_mode,
            });
        }

        if let Command::ProgramServo { value, .. } = command {
            if value > MAX_SERVO_VALUE {
                return Err(RejectReason::InvalidArgument {
                    details: format!("servo value {value} exceeds {MAX_SERVO_VALUE}"),
                });
            }
        }

        let line = FrameCodec::encode(self.team_id, &command);
        Ok(AdmittedCommand { command, line })
    }
}

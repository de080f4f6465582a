//! Line protocol for the shared command/telemetry link.
//!
//! Inbound lines are either `$`-prefixed control messages or comma-separated
//! telemetry. Outbound lines are always `CMD,<team_id>,<verb>,<payload>\n`.
//!
//! ```rust
//! use cansat_ground::codec::{Decoded, FrameCodec};
//! use cansat_ground::types::Command;
//!
//! let decoded = FrameCodec::decode("3114,00:00:01,1,F,LAUNCH_PAD,0.5").unwrap();
//! assert!(matches!(decoded, Decoded::Telemetry(ref frame) if frame.team_id == 3114));
//!
//! assert_eq!(FrameCodec::encode(3114, &Command::Ping), "CMD,3114,TEST,X\n");
//! ```

mod control;
mod telemetry;

pub(crate) use control::LOG_END_SENTINEL;
pub use telemetry::TELEMETRY_FIELD_COUNT;

use crate::error::DecodeError;
use crate::types::{Command, ControlMessage, TelemetryFrame};

const CONTROL_PREFIX: char = '$';

/// Result of decoding one inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Telemetry(TelemetryFrame),
    Control(ControlMessage),
}

/// Stateless encoder/decoder for the line protocol.
pub struct FrameCodec;

impl FrameCodec {
    /// Decode one line with its line terminator already removed.
    pub fn decode(line: &str) -> Result<Decoded, DecodeError> {
        if line.chars().all(|c| c == ',' || c.is_whitespace()) {
            return Err(DecodeError::Empty);
        }

        let line = line.trim();
        if line.starts_with(CONTROL_PREFIX) {
            Ok(Decoded::Control(control::parse_control(line)))
        } else {
            telemetry::parse_telemetry(line).map(Decoded::Telemetry)
        }
    }

    /// Render a command for the wire. Pure formatting, no I/O.
    pub fn encode(team_id: u32, command: &Command) -> String {
        let payload: String =
            command.payload().chars().filter(|c| *c != '\n' && *c != '\r').collect();
        format!("CMD,{},{},{}\n", team_id, command.verb(), payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CameraId, ServoId, Severity, TimeSource};
    use proptest::prelude::*;

    #[test]
    fn blank_lines_are_empty() {
        for line in ["", "   ", ",,,,", " , ,\t"] {
            assert_eq!(FrameCodec::decode(line), Err(DecodeError::Empty), "{line:?}");
        }
    }

    #[test]
    fn dollar_lines_are_control() {
        let decoded = FrameCodec::decode("$MSG:hello").expect("control");
        assert_eq!(
            decoded,
            Decoded::Control(ControlMessage::StatusEvent {
                text: "hello".into(),
                severity: Severity::Info
            })
        );
    }

    #[test]
    fn encode_formats_every_command() {
        assert_eq!(FrameCodec::encode(3114, &Command::Ping), "CMD,3114,TEST,X\n");
        assert_eq!(
            FrameCodec::encode(1000, &Command::ProgramServo { servo: ServoId::Release, value: 45 }),
            "CMD,1000,MEC,SERVO:1|45\n"
        );
        assert_eq!(
            FrameCodec::encode(3114, &Command::CameraStatus(CameraId::Camera2)),
            "CMD,3114,MEC,CAMERA2_STAT:X\n"
        );
    }

    #[test]
    fn encode_strips_embedded_line_breaks() {
        let command = Command::SetTime(TimeSource::Utc("12:00:00\r\n".into()));
        assert_eq!(FrameCodec::encode(1, &command), "CMD,1,ST,12:00:00\n");
    }

    proptest! {
        #[test]
        fn truncated_lines_keep_only_the_prefix(cut in 1usize..=TELEMETRY_FIELD_COUNT) {
            let full = "3114,00:12:45,12,F,DESCENT,1234.5,22.1,101.3,5.01,1,2,3,10,20,30,\
                        0.1,0.2,0.3,15,12:00:00,1200.0,38.15,-79.07,7,NONE,3";
            let prefix = full.split(',').take(cut).collect::<Vec<_>>().join(",");
            let Ok(Decoded::Telemetry(frame)) = FrameCodec::decode(&prefix) else {
                return Err(TestCaseError::fail("prefix should decode"));
            };
            prop_assert_eq!(frame.team_id, 3114);
            prop_assert_eq!(frame.cam_status.is_some(), cut > 25);
            prop_assert_eq!(frame.cmd_echo.is_some(), cut > 24);
            prop_assert_eq!(frame.gps.lon.is_some(), cut > 22);
            prop_assert_eq!(frame.auto_gyro_rotation_rate.is_some(), cut > 18);
            prop_assert_eq!(frame.gyro.y.is_some(), cut > 11);
            prop_assert_eq!(frame.altitude.is_some(), cut > 5);
            prop_assert_eq!(frame.mission_time.is_some(), cut > 1);
        }

        #[test]
        fn decode_never_panics(line in "\\PC{0,200}") {
            let _ = FrameCodec::decode(&line);
        }

        #[test]
        fn encode_is_framed(team_id in any::<u32>(), payload in "\\PC{0,40}") {
            let line = FrameCodec::encode(team_id, &Command::SimPressure(payload));
            let prefix = format!("CMD,{},", team_id);
            prop_assert!(line.starts_with(&prefix));
            prop_assert!(line.ends_with('\n'));
            prop_assert_eq!(line.matches('\n').count(), 1);
        }
    }
}

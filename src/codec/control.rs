//! `$`-prefixed control line parsing

use crate::types::{ControlMessage, MissionInfo, Severity};

pub(crate) const LOG_BEGIN_SENTINEL: &str = "$LOGFILE:BEGIN";
pub(crate) const LOG_END_SENTINEL: &str = "$LOGFILE:END";
const SIMP_BEGIN_MARKER: &str = "BEGIN_SIMP";
const ERROR_PREFIX: &str = "$E";
const MESSAGE_MARKER: &str = "MSG:";

/// Text after the first `MSG:` marker, or the whole line flagged as unexpected.
fn message_text(line: &str) -> String {
    match line.find(MESSAGE_MARKER) {
        Some(pos) if pos + MESSAGE_MARKER.len() < line.len() => {
            line[pos + MESSAGE_MARKER.len()..].to_string()
        }
        _ => format!("(UNEXPECTED FORMAT):{line}"),
    }
}

/// Byte positions of the first balanced, non-empty `{...}` segment at or
/// after `from`.
fn bracket_span(text: &str, from: usize) -> Option<(usize, usize)> {
    let mut search = from;
    while let Some(rel) = text[search..].find('{') {
        let open = search + rel;
        let close = open + 1 + text[open + 1..].find('}')?;
        let body = &text[open + 1..close];
        if !body.is_empty() && !body.contains('{') {
            return Some((open, close));
        }
        search = open + 1;
    }
    None
}

/// Pull out the first `{MODE|STATE}` payload and strip every bracketed
/// segment from the text.
fn extract_mission_info(text: &str) -> (Option<MissionInfo>, String) {
    let Some((open, close)) = bracket_span(text, 0) else {
        return (None, text.to_string());
    };
    let payload = &text[open + 1..close];

    let mut residual = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some((open, close)) = bracket_span(text, cursor) {
        residual.push_str(&text[cursor..open]);
        residual.push(' ');
        cursor = close + 1;
    }
    residual.push_str(&text[cursor..]);
    let residual = residual.split_whitespace().collect::<Vec<_>>().join(" ");

    let mission = payload.split_once('|').map(|(mode, state)| MissionInfo {
        mode: mode.trim().to_string(),
        state: state.trim().to_string(),
    });
    match mission {
        Some(info) => (Some(info), residual),
        // no separator: not a mission payload, keep the text as sent
        None => (None, text.to_string()),
    }
}

/// Classify a control line. The caller guarantees it starts with `$`.
pub(crate) fn parse_control(line: &str) -> ControlMessage {
    if line.contains(LOG_BEGIN_SENTINEL) {
        return ControlMessage::LogBegin;
    }
    if line.contains(LOG_END_SENTINEL) {
        return ControlMessage::LogEnd;
    }

    let severity =
        if line.starts_with(ERROR_PREFIX) { Severity::Error } else { Severity::Info };
    let (mission, text) = extract_mission_info(&message_text(line));

    if line.contains(SIMP_BEGIN_MARKER) {
        return ControlMessage::SimpBegin { mission, text, severity };
    }

    match mission {
        Some(MissionInfo { mode, state }) => {
            ControlMessage::ModeStateUpdate { mode, state, text, severity }
        }
        None => ControlMessage::StatusEvent { text, severity },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracketed_payload_is_removed_from_text() {
        let msg = parse_control("$MSG:Status update {SIM|DESCENT} extra text");
        assert_eq!(
            msg,
            ControlMessage::ModeStateUpdate {
                mode: "SIM".into(),
                state: "DESCENT".into(),
                text: "Status update extra text".into(),
                severity: Severity::Info,
            }
        );
    }

    #[test]
    fn missing_marker_is_flagged() {
        let msg = parse_control("$CAMERA1 ON");
        assert_eq!(
            msg,
            ControlMessage::StatusEvent {
                text: "(UNEXPECTED FORMAT):$CAMERA1 ON".into(),
                severity: Severity::Info,
            }
        );
    }

    #[test]
    fn empty_message_after_marker_is_flagged() {
        let msg = parse_control("$MSG:");
        assert_eq!(msg.log_text().map(|(t, _)| t), Some("(UNEXPECTED FORMAT):$MSG:"));
    }

    #[test]
    fn error_prefix_sets_severity() {
        let msg = parse_control("$E MSG:Servo fault");
        assert_eq!(
            msg,
            ControlMessage::StatusEvent { text: "Servo fault".into(), severity: Severity::Error }
        );
    }

    #[test]
    fn sentinels_take_priority() {
        assert_eq!(parse_control("$LOGFILE:BEGIN"), ControlMessage::LogBegin);
        assert_eq!(parse_control("$junk $LOGFILE:END"), ControlMessage::LogEnd);
    }

    #[test]
    fn simp_begin_keeps_mode_announcement() {
        let msg = parse_control("$MSG:BEGIN_SIMP {SIM|LAUNCH_PAD}");
        assert_eq!(
            msg,
            ControlMessage::SimpBegin {
                mission: Some(MissionInfo { mode: "SIM".into(), state: "LAUNCH_PAD".into() }),
                text: "BEGIN_SIMP".into(),
                severity: Severity::Info,
            }
        );
    }

    #[test]
    fn payload_without_separator_is_plain_text() {
        let msg = parse_control("$MSG:value {42} ok");
        assert_eq!(
            msg,
            ControlMessage::StatusEvent { text: "value {42} ok".into(), severity: Severity::Info }
        );
    }

    #[test]
    fn empty_braces_are_skipped() {
        let (info, text) = extract_mission_info("a {} b {FLIGHT|ASCENT}");
        assert_eq!(info, Some(MissionInfo { mode: "FLIGHT".into(), state: "ASCENT".into() }));
        assert_eq!(text, "a {} b");
    }

    #[test]
    fn only_first_payload_is_used_but_all_are_stripped() {
        let (info, text) = extract_mission_info("{SIM|DESCENT} x {FLIGHT|LANDED} y");
        assert_eq!(info, Some(MissionInfo { mode: "SIM".into(), state: "DESCENT".into() }));
        assert_eq!(text, "x y");
    }
}

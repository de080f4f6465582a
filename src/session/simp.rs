//! SIMP playback script

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ResourceError;
use crate::types::Command;

/// Prefix of the usable script lines. `$` stands in for the team id.
pub const SIMP_PLACEHOLDER_PREFIX: &str = "CMD,$,SIMP";

/// Simulated pressure readings loaded from a script file.
///
/// Only lines starting with [`SIMP_PLACEHOLDER_PREFIX`] are kept; everything
/// else (comments, blank lines) is skipped. The team id is filled in when a
/// line is sent, so a team id change mid-playback is honoured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpScript {
    path: PathBuf,
    payloads: Vec<String>,
}

impl SimpScript {
    /// Read and filter a script, refusing files over `max_bytes` or not UTF-8.
    pub fn load(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let missing = |source| ResourceError::ScriptMissing { path: path.to_path_buf(), source };

        let file = File::open(path).map_err(missing)?;
        let size = file.metadata().map_err(missing)?.len();
        if size > max_bytes {
            return Err(ResourceError::ScriptTooLarge {
                path: path.to_path_buf(),
                size,
                limit: max_bytes,
            });
        }

        // the file may grow between stat and read
        let mut bytes = Vec::with_capacity(size as usize);
        file.take(max_bytes + 1).read_to_end(&mut bytes).map_err(missing)?;
        if bytes.len() as u64 > max_bytes {
            return Err(ResourceError::ScriptTooLarge {
                path: path.to_path_buf(),
                size: bytes.len() as u64,
                limit: max_bytes,
            });
        }

        let text = String::from_utf8(bytes)
            .map_err(|_| ResourceError::ScriptEncoding { path: path.to_path_buf() })?;
        let script = Self::parse(path, &text);
        info!("Loaded {} SIMP lines from {}", script.len(), path.display());
        Ok(script)
    }

    fn parse(path: &Path, text: &str) -> Self {
        let payloads = text
            .lines()
            .filter_map(|line| line.strip_prefix(SIMP_PLACEHOLDER_PREFIX))
            .map(|rest| rest.strip_prefix(',').unwrap_or(rest).trim().to_string())
            .collect();
        Self { path: path.to_path_buf(), payloads }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Playback cursor over a loaded script.
#[derive(Debug, Default)]
pub struct SimpPlayback {
    script: Option<SimpScript>,
    cursor: usize,
    running: bool,
}

impl SimpPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin sending `script` from its first line.
    pub fn start(&mut self, script: SimpScript) {
        info!(lines = script.len(), "SIMP playback started from {}", script.path().display());
        self.script = Some(script);
        self.cursor = 0;
        self.running = true;
    }

    /// Stop sending and rewind the cursor. Returns whether playback was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        self.cursor = 0;
        if was_running {
            debug!("SIMP playback stopped");
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// `(sent, total)` for the current script.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor, self.script.as_ref().map_or(0, SimpScript::len))
    }

    /// Next command to send. Returns `None` and stops once the script is
    /// exhausted.
    pub fn next_command(&mut self) -> Option<Command> {
        if !self.running {
            return None;
        }
        let payload = self.script.as_ref().and_then(|s| s.payloads.get(self.cursor)).cloned();
        match payload {
            Some(payload) => {
                self.cursor += 1;
                Some(Command::SimPressure(payload))
            }
            None => {
                debug!("SIMP script exhausted after {} lines", self.cursor);
                self.running = false;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_simp_fixture;

    #[test]
    fn keeps_only_placeholder_lines() {
        let script = SimpScript::parse(
            Path::new("inline"),
            "# header\nCMD,$,SIMP,101325\n\nCMD,$,SIMP,101300 \r\nCMD,3114,SIMP,1\n",
        );
        assert_eq!(script.payloads, vec!["101325", "101300"]);
    }

    #[test]
    fn plays_to_the_end_then_stops() {
        let mut playback = SimpPlayback::new();
        playback.start(SimpScript::parse(Path::new("inline"), "CMD,$,SIMP,1\nCMD,$,SIMP,2\n"));
        assert_eq!(playback.next_command(), Some(Command::SimPressure("1".into())));
        assert_eq!(playback.progress(), (1, 2));
        assert_eq!(playback.next_command(), Some(Command::SimPressure("2".into())));
        assert_eq!(playback.next_command(), None);
        assert!(!playback.is_running());
        assert_eq!(playback.next_command(), None);
    }

    #[test]
    fn stop_rewinds() {
        let mut playback = SimpPlayback::new();
        playback.start(SimpScript::parse(Path::new("inline"), "CMD,$,SIMP,1\n"));
        playback.next_command();
        assert!(playback.stop());
        assert!(!playback.stop());
        assert_eq!(playback.progress(), (0, 1));
        assert_eq!(playback.next_command(), None);
    }

    #[test]
    fn load_reads_fixture() {
        let path = write_simp_fixture("load_reads_fixture", &["101325", "99000"]);
        let script = SimpScript::load(&path, 1024).expect("fixture loads");
        assert_eq!(script.len(), 2);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SimpScript::load("definitely/not/here/simp.txt", 1024).unwrap_err();
        assert!(matches!(err, ResourceError::ScriptMissing { .. }));
    }

    #[test]
    fn load_enforces_size_limit() {
        let path = write_simp_fixture("load_enforces_size_limit", &["101325"; 32]);
        let err = SimpScript::load(&path, 16).unwrap_err();
        assert!(matches!(err, ResourceError::ScriptTooLarge { limit: 16, .. }));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_rejects_invalid_utf8() {
        let path = std::env::temp_dir().join("cansat_simp_invalid_utf8.txt");
        std::fs::write(&path, [b'C', b'M', b'D', 0xff, 0xfe]).expect("write fixture");
        let err = SimpScript::load(&path, 1024).unwrap_err();
        assert!(matches!(err, ResourceError::ScriptEncoding { .. }));
        let _ = std::fs::remove_file(path);
    }
}

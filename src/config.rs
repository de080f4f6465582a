//! Station configuration
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```rust
//! use cansat_ground::StationConfig;
//!
//! let config = StationConfig::from_yaml_str("team_id: 1000\nwindow_capacity: 250\n").unwrap();
//! assert_eq!(config.team_id, 1000);
//! assert_eq!(config.simp_interval_ms, 1000);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GroundStationError, Result};
use crate::types::UpdateRate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Team id written into every outgoing command.
    pub team_id: u32,
    /// Points kept by every plot window.
    pub window_capacity: usize,
    /// Delay between SIMP lines during playback.
    pub simp_interval_ms: u64,
    pub simp_script: PathBuf,
    /// Largest SIMP script accepted, in bytes.
    pub simp_max_bytes: u64,
    /// Abort a log transfer after this long without a line.
    pub bulk_timeout_ms: u64,
    pub bulk_log_path: PathBuf,
    /// Initial point of the GPS track plot, `[lat, lon]`.
    pub gps_origin: [f64; 2],
    pub snapshot_rate: UpdateRate,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            team_id: 3114,
            window_capacity: 500,
            simp_interval_ms: 1000,
            simp_script: PathBuf::from("cansat_2023_simp.txt"),
            simp_max_bytes: 1024 * 1024,
            bulk_timeout_ms: 30_000,
            bulk_log_path: PathBuf::from("cansat_logs.txt"),
            gps_origin: [38.149574, 79.0737],
            snapshot_rate: UpdateRate::default(),
        }
    }
}

impl StationConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: StationConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| GroundStationError::config("station YAML", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_yaml_str(&yaml)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(team_id = config.team_id, "Loaded station config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_capacity < 2 {
            return Err(GroundStationError::config(
                "window_capacity",
                format!("must be at least 2, got {}", self.window_capacity),
            ));
        }
        if self.simp_interval_ms == 0 {
            return Err(GroundStationError::config("simp_interval_ms", "must be greater than 0"));
        }
        if self.bulk_timeout_ms == 0 {
            return Err(GroundStationError::config("bulk_timeout_ms", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn simp_interval(&self) -> Duration {
        Duration::from_millis(self.simp_interval_ms)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_millis(self.bulk_timeout_ms)
    }

    pub fn gps_origin(&self) -> (f64, f64) {
        (self.gps_origin[0], self.gps_origin[1])
    }
}

//! Update rate control for snapshot streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often window snapshots reach a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every snapshot the router publishes (one per redraw batch)
    Native,

    /// At most this many snapshots per second, latest wins.
    /// `Max(0)` means unthrottled.
    Max(u32),
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Max(30)
    }
}

impl UpdateRate {
    /// Minimum gap between two snapshots, or `None` when unthrottled.
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

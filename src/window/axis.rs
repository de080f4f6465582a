//! Relative time axis shared by the time-series windows

use std::collections::VecDeque;
use std::time::Instant;

/// `n` evenly spaced values from `start` to `end` inclusive.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> VecDeque<f64> {
    match n {
        0 => VecDeque::new(),
        1 => VecDeque::from([start]),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Fixed-length time axis.
///
/// Starts as `linspace(-capacity, 0, capacity)`. Each advance drops the
/// oldest slot and appends `newest + elapsed_wall_time`; the first advance
/// after construction or reset adds zero.
#[derive(Debug, Clone)]
pub(crate) struct TimeAxis {
    values: VecDeque<f64>,
    last_update: Option<Instant>,
}

impl TimeAxis {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { values: Self::initial(capacity), last_update: None }
    }

    fn initial(capacity: usize) -> VecDeque<f64> {
        linspace(-(capacity as f64), 0.0, capacity)
    }

    /// Advance by the wall time since the previous advance. Returns the new
    /// newest axis value.
    pub(crate) fn advance(&mut self, now: Instant) -> f64 {
        let elapsed = self
            .last_update
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_update = Some(now);

        let next = self.values.back().copied().unwrap_or(0.0) + elapsed;
        self.values.pop_front();
        self.values.push_back(next);
        next
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn reset(&mut self) {
        self.values = Self::initial(self.values.len());
        self.last_update = None;
    }

    pub(crate) fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }
}

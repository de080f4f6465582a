//! Single-line time-series window

use std::collections::VecDeque;
use std::time::Instant;

use super::axis::TimeAxis;
use super::{SampleWindow, WindowSnapshot};

#[derive(Debug, Clone)]
pub struct ScalarWindow {
    values: VecDeque<f64>,
    axis: TimeAxis,
}

impl ScalarWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { values: VecDeque::from(vec![0.0; capacity]), axis: TimeAxis::new(capacity) }
    }

    pub fn update(&mut self, value: f64) {
        self.update_at(value, Instant::now());
    }

    /// Append one value, evicting the oldest, and advance the time axis.
    pub fn update_at(&mut self, value: f64, now: Instant) {
        self.values.pop_front();
        self.values.push_back(value);
        self.axis.advance(now);
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }
}

impl SampleWindow for ScalarWindow {
    fn capacity(&self) -> usize {
        self.values.len()
    }

    fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.axis.reset();
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            x: self.axis.to_vec(),
            y: vec![self.values.iter().copied().collect()],
        }
    }
}

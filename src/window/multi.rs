//! Multi-line time-series window sharing one time axis

use std::collections::VecDeque;
use std::time::Instant;

use super::axis::TimeAxis;
use super::{SampleWindow, WindowSnapshot};

/// `n` channels over one shared time axis.
///
/// A channel with no value in an update keeps its buffer untouched, while the
/// time axis still advances once per update. Frames with missing sensor
/// columns therefore never desynchronise the shared time base.
#[derive(Debug, Clone)]
pub struct MultiChannelWindow {
    channels: Vec<VecDeque<f64>>,
    axis: TimeAxis,
}

impl MultiChannelWindow {
    pub fn new(capacity: usize, channels: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: vec![VecDeque::from(vec![0.0; capacity]); channels],
            axis: TimeAxis::new(capacity),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn update(&mut self, values: &[Option<f64>]) {
        self.update_at(values, Instant::now());
    }

    /// Values beyond the channel count are ignored; missing ones count as `None`.
    pub fn update_at(&mut self, values: &[Option<f64>], now: Instant) {
        for (buffer, value) in self.channels.iter_mut().zip(values) {
            if let Some(value) = value {
                buffer.pop_front();
                buffer.push_back(*value);
            }
        }
        self.axis.advance(now);
    }

    pub fn latest(&self) -> Vec<f64> {
        self.channels.iter().map(|c| c.back().copied().unwrap_or(0.0)).collect()
    }
}

impl SampleWindow for MultiChannelWindow {
    fn capacity(&self) -> usize {
        self.axis.len()
    }

    fn reset(&mut self) {
        for buffer in &mut self.channels {
            buffer.iter_mut().for_each(|v| *v = 0.0);
        }
        self.axis.reset();
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            x: self.axis.to_vec(),
            y: self.channels.iter().map(|c| c.iter().copied().collect()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn absent_channels_keep_their_slots() {
        let mut window = MultiChannelWindow::new(3, 3);
        let t0 = Instant::now();
        window.update_at(&[Some(1.0), Some(10.0), Some(100.0)], t0);
        window.update_at(&[Some(2.0), None, Some(200.0)], t0 + Duration::from_secs(1));

        let snapshot = window.snapshot();
        assert_eq!(snapshot.y[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(snapshot.y[1], vec![0.0, 0.0, 10.0]);
        assert_eq!(snapshot.y[2], vec![0.0, 100.0, 200.0]);
        // the axis moved twice regardless
        assert_eq!(snapshot.x, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn all_none_still_advances_time() {
        let mut window = MultiChannelWindow::new(2, 3);
        let t0 = Instant::now();
        window.update_at(&[None, None, None], t0);
        window.update_at(&[None, None, None], t0 + Duration::from_secs(3));
        assert_eq!(window.snapshot().x, vec![0.0, 3.0]);
        assert_eq!(window.latest(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn short_updates_treat_missing_channels_as_absent() {
        let mut window = MultiChannelWindow::new(2, 3);
        window.update_at(&[Some(5.0)], Instant::now());
        assert_eq!(window.latest(), vec![5.0, 0.0, 0.0]);
    }

    #[test]
    fn reset_rezeros_every_channel() {
        let mut window = MultiChannelWindow::new(4, 2);
        window.update(&[Some(1.0), Some(2.0)]);
        window.reset();
        let snapshot = window.snapshot();
        assert!(snapshot.y.iter().flatten().all(|v| *v == 0.0));
        assert_eq!(snapshot.x, Vec::from(super::super::axis::linspace(-4.0, 0.0, 4)));
    }
}

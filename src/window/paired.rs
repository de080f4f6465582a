//! Two-axis window where both coordinates come from the data

use std::collections::VecDeque;

use super::{SampleWindow, WindowSnapshot};

/// Track plot buffer (latitude against longitude).
///
/// There is no derived time axis. Reset broadcasts the last known point over
/// the whole buffer so the plot does not jump back to the origin.
#[derive(Debug, Clone)]
pub struct PairedAxisWindow {
    xs: VecDeque<f64>,
    ys: VecDeque<f64>,
}

impl PairedAxisWindow {
    pub fn new(capacity: usize, initial: (f64, f64)) -> Self {
        let capacity = capacity.max(1);
        Self {
            xs: VecDeque::from(vec![initial.0; capacity]),
            ys: VecDeque::from(vec![initial.1; capacity]),
        }
    }

    pub fn update(&mut self, x: f64, y: f64) {
        self.xs.pop_front();
        self.xs.push_back(x);
        self.ys.pop_front();
        self.ys.push_back(y);
    }

    pub fn latest(&self) -> (f64, f64) {
        (self.xs.back().copied().unwrap_or(0.0), self.ys.back().copied().unwrap_or(0.0))
    }
}

impl SampleWindow for PairedAxisWindow {
    fn capacity(&self) -> usize {
        self.xs.len()
    }

    fn reset(&mut self) {
        let (x, y) = self.latest();
        self.xs.iter_mut().for_each(|v| *v = x);
        self.ys.iter_mut().for_each(|v| *v = y);
    }

    fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            x: self.xs.iter().copied().collect(),
            y: vec![self.ys.iter().copied().collect()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_initial_point() {
        let window = PairedAxisWindow::new(3, (38.149574, 79.0737));
        let snapshot = window.snapshot();
        assert_eq!(snapshot.x, vec![38.149574; 3]);
        assert_eq!(snapshot.y, vec![vec![79.0737; 3]]);
    }

    #[test]
    fn reset_broadcasts_last_point() {
        let mut window = PairedAxisWindow::new(4, (0.0, 0.0));
        window.update(1.0, 2.0);
        window.update(3.0, 4.0);
        window.reset();
        let snapshot = window.snapshot();
        assert_eq!(snapshot.x, vec![3.0; 4]);
        assert_eq!(snapshot.y[0], vec![4.0; 4]);

        // a second reset keeps the same point
        window.reset();
        assert_eq!(window.latest(), (3.0, 4.0));
    }

    #[test]
    fn evicts_oldest_pair() {
        let mut window = PairedAxisWindow::new(2, (0.0, 0.0));
        window.update(1.0, -1.0);
        window.update(2.0, -2.0);
        window.update(3.0, -3.0);
        let snapshot = window.snapshot();
        assert_eq!(snapshot.x, vec![2.0, 3.0]);
        assert_eq!(snapshot.y[0], vec![-2.0, -3.0]);
    }
}

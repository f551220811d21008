//! Pack-voltage trend classification over a sliding sample window.

use std::collections::VecDeque;

/// Direction of the pack voltage over the last full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trend {
    /// Voltage rose by more than the threshold; the pack is charging.
    Up,
    /// Voltage fell by more than the threshold; the pack is discharging.
    Down,
    /// Within the jitter threshold, or the window is not yet full.
    #[default]
    Flat,
}

/// Compares the newest sample in a sliding window against the oldest.
///
/// The window is never reset: samples from before an auto-pilot toggle or a
/// session boundary keep contributing until they age out, so the trend is a
/// property of the link, not of any one session.
#[derive(Debug, Clone)]
pub struct TrendDetector {
    window: VecDeque<f64>,
    capacity: usize,
    threshold_v: f64,
}

impl TrendDetector {
    pub fn new(capacity: usize, threshold_v: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            threshold_v,
        }
    }

    /// Push one pack-voltage sample, evicting the oldest once full.
    pub fn observe(&mut self, pack_voltage: f64) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(pack_voltage);
    }

    /// `Flat` until the window has filled once.
    pub fn classify(&self) -> Trend {
        if self.window.len() < self.capacity {
            return Trend::Flat;
        }
        let (Some(oldest), Some(newest)) = (self.window.front(), self.window.back()) else {
            return Trend::Flat;
        };
        let delta = newest - oldest;
        if delta > self.threshold_v {
            Trend::Up
        } else if delta < -self.threshold_v {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.len() == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_until_window_fills_then_live() {
        let mut t = TrendDetector::new(30, 0.01);
        for _ in 0..29 {
            t.observe(24.00);
        }
        assert!(!t.is_warmed_up());
        assert_eq!(t.classify(), Trend::Flat);

        // The 30th sample fills the window and classification goes live.
        t.observe(24.02);
        assert!(t.is_warmed_up());
        assert_eq!(t.classify(), Trend::Up);
    }

    #[test]
    fn thirty_identical_samples_read_flat() {
        let mut t = TrendDetector::new(30, 0.01);
        for _ in 0..30 {
            t.observe(24.0);
        }
        assert_eq!(t.classify(), Trend::Flat);
    }

    #[test]
    fn jitter_below_threshold_is_flat() {
        let mut t = TrendDetector::new(3, 0.01);
        t.observe(24.000);
        t.observe(24.004);
        t.observe(24.009);
        assert_eq!(t.classify(), Trend::Flat);
    }

    #[test]
    fn discharge_reads_down() {
        let mut t = TrendDetector::new(3, 0.01);
        t.observe(24.10);
        t.observe(24.05);
        t.observe(24.00);
        assert_eq!(t.classify(), Trend::Down);
    }
}

//! Rolling window of recent acceleration magnitudes.

use std::collections::VecDeque;

/// Number of magnitudes kept; older ones are evicted first.
pub const HISTORY_CAPACITY: usize = 10;

/// Entries considered when taking the recent peak.
pub const RECENT_WINDOW: usize = 3;

/// Below this many entries no spike is evaluated.
pub const MIN_SAMPLES_FOR_SPIKE: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct MagnitudeHistory {
    values: VecDeque<f64>,
}

impl MagnitudeHistory {
    pub fn new() -> Self {
        Self {
            values: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, magnitude: f64) {
        if self.values.len() >= HISTORY_CAPACITY {
            self.values.pop_front();
        }
        self.values.push_back(magnitude);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Oldest first.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Peak over the newest `n` entries.
    pub fn recent_max(&self, n: usize) -> Option<f64> {
        self.values
            .iter()
            .rev()
            .take(n)
            .copied()
            .reduce(f64::max)
    }

    /// How far the recent peak rises above the rolling average. Slow
    /// offsets such as gravity or a tilted phone cancel out.
    pub fn spike(&self) -> Option<f64> {
        Some(self.recent_max(RECENT_WINDOW)? - self.mean()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = MagnitudeHistory::new();
        for i in 0..15 {
            history.push(i as f64);
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        let kept: Vec<f64> = history.values().collect();
        let expected: Vec<f64> = (5..15).map(|i| i as f64).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn spike_matches_hand_computed_value() {
        let mut history = MagnitudeHistory::new();
        for m in [9.8, 9.9, 10.1, 9.7, 9.8, 10.0, 9.9, 25.0, 12.0, 9.8] {
            history.push(m);
        }
        // mean = 116.0 / 10, recent max = 25.0
        let spike = history.spike().unwrap();
        assert!((spike - (25.0 - 11.6)).abs() < 1e-9, "spike was {spike}");
    }

    #[test]
    fn recent_max_only_looks_at_newest_entries() {
        let mut history = MagnitudeHistory::new();
        for m in [50.0, 1.0, 2.0, 3.0] {
            history.push(m);
        }
        assert_eq!(history.recent_max(RECENT_WINDOW), Some(3.0));
        assert_eq!(history.recent_max(10), Some(50.0));
    }

    #[test]
    fn empty_history_has_no_statistics() {
        let mut history = MagnitudeHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.mean(), None);
        assert_eq!(history.spike(), None);

        history.push(4.0);
        history.clear();
        assert_eq!(history.len(), 0);
    }
}

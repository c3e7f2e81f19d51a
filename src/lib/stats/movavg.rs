use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("moving-average window must hold at least 2 samples, got {0}")]
    WindowTooSmall(usize),
}

/// Arithmetic mean over a sliding window of the most recent samples.
///
/// The window is a fixed-size ring: once full, each insertion evicts the
/// oldest sample. The running sum is kept in step with the stored values so
/// reading the mean is O(1).
#[derive(Debug, Clone)]
pub struct MovingAvg {
    window: Vec<f64>,
    off: usize,
    count: usize,
    sum: f64,
}

impl MovingAvg {
    pub fn new(capacity: usize) -> Result<Self, Error> {
        if capacity < 2 {
            return Err(Error::WindowTooSmall(capacity));
        }
        Ok(Self {
            window: vec![0.0; capacity],
            off: 0,
            count: 0,
            sum: 0.0,
        })
    }

    /// Insert a sample, evicting the oldest one if the window is full.
    /// Returns the mean after accounting for the new sample.
    pub fn add(&mut self, value: f64) -> f64 {
        if self.count < self.window.len() {
            self.count += 1;
        } else {
            self.off %= self.window.len();
            self.sum -= self.window[self.off];
        }
        self.sum += value;
        self.window[self.off] = value;
        self.off += 1;
        self.sum / self.count as f64
    }

    /// Discard every sample without touching the allocation.
    pub fn clear(&mut self) {
        self.window.fill(0.0);
        self.off = 0;
        self.count = 0;
        self.sum = 0.0;
    }

    /// Current mean, or 0 while no samples have been inserted yet. Callers
    /// must tolerate the "no data yet" zero.
    pub fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn capacity(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_windows() {
        assert_eq!(MovingAvg::new(0).unwrap_err(), Error::WindowTooSmall(0));
        assert_eq!(MovingAvg::new(1).unwrap_err(), Error::WindowTooSmall(1));
        assert!(MovingAvg::new(2).is_ok());
    }

    #[test]
    fn empty_value_is_zero() {
        let avg = MovingAvg::new(4).unwrap();
        assert_eq!(avg.value(), 0.0);
    }

    #[test]
    fn add_returns_running_mean() {
        let mut avg = MovingAvg::new(4).unwrap();
        assert_eq!(avg.add(2.0), 2.0);
        assert_eq!(avg.add(4.0), 3.0);
        assert_eq!(avg.add(6.0), 4.0);
    }

    #[test]
    fn window_holds_exactly_the_last_capacity_samples() {
        let mut avg = MovingAvg::new(4).unwrap();
        for sample in 1..=10 {
            avg.add(f64::from(sample));
        }
        // Mean of 7, 8, 9, 10 -- not of all ten insertions.
        assert_eq!(avg.value(), 8.5);
    }

    #[test]
    fn eviction_keeps_the_sum_exact() {
        let mut avg = MovingAvg::new(2).unwrap();
        avg.add(100.0);
        avg.add(50.0);
        assert_eq!(avg.add(10.0), 30.0); // (50 + 10) / 2
        assert_eq!(avg.add(10.0), 10.0);
    }

    #[test]
    fn clear_resets_to_the_empty_state() {
        let mut avg = MovingAvg::new(3).unwrap();
        avg.add(5.0);
        avg.add(7.0);
        avg.clear();
        assert_eq!(avg.value(), 0.0);
        assert_eq!(avg.capacity(), 3);
        assert_eq!(avg.add(9.0), 9.0);
    }
}

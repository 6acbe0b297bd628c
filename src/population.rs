//! Scalar statistics accumulator.
//!
//! Every statistical screening pass in the engine funnels its normalized
//! measurements through a [`Population`]: one bucket per measurement
//! category, each reporting cardinality, mean and standard deviation. The
//! acceptance bounds of the post-analysis filter are derived from these
//! numbers, so the accumulator deliberately stays tiny and allocation-free.
//!
//! A population is local to one pass and never retained across stages.

/// Accumulates a stream of scalar measurements.
///
/// Measurements are expected to be normalized by the caller (typically a
/// value divided by the local interline) so that observations from staves of
/// different sizes are comparable.
#[derive(Clone, Debug, Default)]
pub struct Population {
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one measurement.
    pub fn include(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Removes one previously included measurement.
    pub fn exclude(&mut self, value: f64) {
        debug_assert!(self.count > 0, "exclude on empty population");
        if self.count > 0 {
            self.count -= 1;
            self.sum -= value;
            self.sum_sq -= value * value;
        }
    }

    /// Number of measurements seen so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Mean value, or `None` when the population is empty.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    /// Unbiased sample variance; 0 for fewer than two measurements.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        if self.count < 2 {
            return Some(0.0);
        }
        let raw = (self.sum_sq - self.sum * mean) / (self.count as f64 - 1.0);
        // Cancellation can push the estimate slightly below zero.
        Some(raw.max(0.0))
    }

    /// Unbiased sample standard deviation; 0 for fewer than two measurements.
    pub fn standard_deviation(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}

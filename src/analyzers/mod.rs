//! Frame analyzers: reduce one frame to a scalar the controller can act on
//!
//! An analyzer sees every frame of a run through [`Analyzer::process_image`]
//! and keeps the single-frame reduction around as its intermittent output.
//! At each controller refresh the loop asks for [`Analyzer::batch_output`],
//! a reduction over all frames seen since the previous refresh.

pub mod spot_counter;

use ndarray::ArrayView2;

pub use spot_counter::{SpotCounter, SpotCounterConfig, SpotMetric};

/// Capability shared by every frame analyzer.
pub trait Analyzer {
    /// Name used as the column prefix in reports.
    fn name(&self) -> &str;

    /// Settings as ordered `key → value` pairs for report headers.
    fn parameters(&self) -> Vec<(String, f64)>;

    /// Analyze one frame and return its single-frame reduction.
    ///
    /// `pixel_size` is the object-space pixel size in micrometers and
    /// `frame_duration` the exposure in seconds.
    fn process_image(&mut self, pixels: &ArrayView2<f64>, pixel_size: f64, frame_duration: f64)
        -> f64;

    /// Reduction of the most recent frame (NaN before the first frame).
    fn intermittent_output(&self) -> f64;

    /// Reduction over the frames seen since the previous call; resets the window.
    fn batch_output(&mut self) -> f64;

    /// Named per-frame outputs of the most recent frame, in column order.
    fn output_values(&self) -> Vec<(String, f64)>;
}

/// Running mean of finite values between two batch reads.
#[derive(Debug, Clone, Default)]
pub struct BatchWindow {
    sum: f64,
    count: usize,
}

impl BatchWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value; non-finite values are ignored.
    pub fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.sum += value;
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Mean of the window, or `fallback` if it holds nothing; clears the window.
    pub fn take_mean(&mut self, fallback: f64) -> f64 {
        let mean = if self.count == 0 {
            fallback
        } else {
            self.sum / self.count as f64
        };
        *self = Self::default();
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_batch_window_mean_and_reset() {
        let mut window = BatchWindow::new();
        window.push(1.0);
        window.push(f64::NAN);
        window.push(4.0);
        assert_eq!(window.len(), 2);

        assert_relative_eq!(window.take_mean(-1.0), 2.5);
        assert!(window.is_empty());
        assert_eq!(window.take_mean(-1.0), -1.0);
    }
}

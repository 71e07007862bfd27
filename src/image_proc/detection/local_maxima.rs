//! Local-maximum spot detection and nearest-neighbor statistics.
//!
//! # Algorithm Overview
//!
//! 1. **Optional pre-filter**: Gaussian smoothing of the frame
//! 2. **Maxima search**: slide a `box_size × box_size` window over the frame;
//!    a pixel is a spot if it is strictly brighter than every other pixel in
//!    its window *and* brighter by at least the noise tolerance
//! 3. **Regions**: each maximum becomes a square region of side `box_size`
//!    centered on it
//! 4. **Statistics**: nearest-neighbor center distance per region, sorted
//!    ascending, reduced to min / mean / 10th-percentile
//!
//! Degenerate frames (zero or one spot) have no nearest neighbors; their
//! distance statistics are `NaN` rather than an error.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::image_proc::convolve2d::{convolve2d_same, gaussian_unit_kernel, kernel_size_for_sigma};

/// Smoothing applied to a frame before the maxima search.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreFilter {
    /// Search the raw frame
    #[default]
    None,
    /// Gaussian blur with the given sigma in pixels
    Gaussian { sigma: f64 },
}

/// Spot detector parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotDetectorConfig {
    /// Minimum margin by which a maximum must exceed its neighbors
    pub noise_tolerance: f64,
    /// Side of the search window and of each spot region (odd, ≥ 3)
    pub box_size: usize,
    /// Smoothing applied before the search
    pub prefilter: PreFilter,
}

impl Default for SpotDetectorConfig {
    fn default() -> Self {
        Self {
            noise_tolerance: 100.0,
            box_size: 5,
            prefilter: PreFilter::None,
        }
    }
}

/// A detected local maximum and its square footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotRegion {
    /// Column of the maximum
    pub x: usize,
    /// Row of the maximum
    pub y: usize,
    /// Leftmost column of the region (may be negative at the border)
    pub left: isize,
    /// Topmost row of the region (may be negative at the border)
    pub top: isize,
    /// Side of the region in pixels
    pub size: usize,
}

impl SpotRegion {
    fn around(x: usize, y: usize, size: usize) -> Self {
        let half = (size / 2) as isize;
        Self {
            x,
            y,
            left: x as isize - half,
            top: y as isize - half,
            size,
        }
    }

    /// Geometric center of the region.
    pub fn center(&self) -> (f64, f64) {
        let half_side = self.size as f64 / 2.0;
        (self.left as f64 + half_side, self.top as f64 + half_side)
    }

    /// Euclidean distance between two region centers.
    pub fn distance_to(&self, other: &SpotRegion) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }
}

/// Per-frame spot statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotStatistics {
    /// Number of detected spots
    pub count: usize,
    /// Smallest nearest-neighbor distance (NaN with fewer than two spots)
    pub min_distance: f64,
    /// Mean nearest-neighbor distance (NaN with fewer than two spots)
    pub mean_distance: f64,
    /// Nearest-neighbor distance at sorted index ⌈count/10⌉, clamped to the
    /// last entry (NaN with fewer than two spots)
    pub p10_distance: f64,
}

impl SpotStatistics {
    /// Reduce a set of regions to count and nearest-neighbor statistics.
    pub fn from_regions(regions: &[SpotRegion]) -> Self {
        let count = regions.len();
        if count < 2 {
            return Self {
                count,
                min_distance: f64::NAN,
                mean_distance: f64::NAN,
                p10_distance: f64::NAN,
            };
        }

        let mut nearest: Vec<f64> = regions
            .iter()
            .enumerate()
            .map(|(i, a)| {
                regions
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, b)| a.distance_to(b))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        nearest.sort_by(f64::total_cmp);

        let mean = nearest.iter().sum::<f64>() / count as f64;
        let p10_index = p10_index(count);

        Self {
            count,
            min_distance: nearest[0],
            mean_distance: mean,
            p10_distance: nearest[p10_index],
        }
    }

    /// Named values in report-column order.
    pub fn output_values(&self) -> Vec<(String, f64)> {
        vec![
            ("spot-count".to_string(), self.count as f64),
            ("min-dist".to_string(), self.min_distance),
            ("mean-dist".to_string(), self.mean_distance),
            ("p10-dist".to_string(), self.p10_distance),
        ]
    }
}

/// Sorted index of the 10th-percentile entry: ⌈count/10⌉ clamped to `count − 1`.
pub fn p10_index(count: usize) -> usize {
    count.div_ceil(10).min(count.saturating_sub(1))
}

/// Immutable spot detector; build a new one to change parameters.
#[derive(Debug, Clone)]
pub struct SpotDetector {
    config: SpotDetectorConfig,
    prefilter_kernel: Option<Array2<f64>>,
}

impl SpotDetector {
    /// Validate the configuration and precompute the pre-filter kernel.
    ///
    /// # Errors
    /// `InvalidConfig` if the box size is even or smaller than 3, the noise
    /// tolerance is negative or not finite, or the pre-filter sigma is not
    /// positive.
    pub fn new(config: SpotDetectorConfig) -> SimResult<Self> {
        if config.box_size % 2 == 0 || config.box_size < 3 {
            return Err(SimulationError::config(format!(
                "box size must be an odd integer >= 3, got {}",
                config.box_size
            )));
        }
        if !(config.noise_tolerance.is_finite() && config.noise_tolerance >= 0.0) {
            return Err(SimulationError::config(format!(
                "noise tolerance must be non-negative, got {}",
                config.noise_tolerance
            )));
        }

        let prefilter_kernel = match config.prefilter {
            PreFilter::None => None,
            PreFilter::Gaussian { sigma } => {
                Some(gaussian_unit_kernel(kernel_size_for_sigma(sigma), sigma)?)
            }
        };

        Ok(Self {
            config,
            prefilter_kernel,
        })
    }

    pub fn config(&self) -> &SpotDetectorConfig {
        &self.config
    }

    pub fn noise_tolerance(&self) -> f64 {
        self.config.noise_tolerance
    }

    pub fn box_size(&self) -> usize {
        self.config.box_size
    }

    /// Find all local maxima, in row-major order.
    pub fn find_spots(&self, pixels: &ArrayView2<f64>) -> Vec<SpotRegion> {
        match &self.prefilter_kernel {
            Some(kernel) => {
                let filtered = convolve2d_same(pixels, &kernel.view());
                self.find_maxima(&filtered.view())
            }
            None => self.find_maxima(pixels),
        }
    }

    /// Detect spots and reduce them to statistics.
    pub fn analyze(&self, pixels: &ArrayView2<f64>) -> SpotStatistics {
        SpotStatistics::from_regions(&self.find_spots(pixels))
    }

    fn find_maxima(&self, pixels: &ArrayView2<f64>) -> Vec<SpotRegion> {
        let (rows, cols) = pixels.dim();
        let half = self.config.box_size / 2;
        let tolerance = self.config.noise_tolerance;

        let mut spots = Vec::new();
        for row in 0..rows {
            let row_lo = row.saturating_sub(half);
            let row_hi = (row + half).min(rows - 1);
            for col in 0..cols {
                let value = pixels[[row, col]];
                let col_lo = col.saturating_sub(half);
                let col_hi = (col + half).min(cols - 1);

                let mut is_max = true;
                'window: for r in row_lo..=row_hi {
                    for c in col_lo..=col_hi {
                        if r == row && c == col {
                            continue;
                        }
                        let other = pixels[[r, c]];
                        if other >= value || value - other < tolerance {
                            is_max = false;
                            break 'window;
                        }
                    }
                }

                if is_max {
                    spots.push(SpotRegion::around(col, row, self.config.box_size));
                }
            }
        }
        spots
    }
}

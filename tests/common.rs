//! Shared helpers for integration tests: synthetic sources and analyzers

#![allow(dead_code)]

use ndarray::Array2;
use smlm_loop::analyzers::{SpotCounter, SpotCounterConfig, SpotMetric};
use smlm_loop::error::SimResult;
use smlm_loop::image_proc::detection::{PreFilter, SpotDetectorConfig};
use smlm_loop::image_proc::Frame;
use smlm_loop::source::{ImageSource, StaticSpot, StaticSpotConfig, StaticSpotSource};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Add a Gaussian spot of the given peak height to `pixels`.
pub fn add_gaussian_spot(pixels: &mut Array2<f64>, x: f64, y: f64, peak: f64, sigma: f64) {
    let (rows, cols) = pixels.dim();
    let two_sigma_sq = 2.0 * sigma * sigma;
    for r in 0..rows {
        for c in 0..cols {
            let d2 = (c as f64 - x).powi(2) + (r as f64 - y).powi(2);
            pixels[[r, c]] += peak * (-d2 / two_sigma_sq).exp();
        }
    }
}

/// Two noise-free spots `separation` pixels apart on a zero background.
pub fn two_spot_source(separation: f64) -> StaticSpotSource {
    StaticSpotSource::new(StaticSpotConfig {
        width_px: 64,
        height_px: 48,
        spots: vec![
            StaticSpot { x: 16.0, y: 24.0 },
            StaticSpot {
                x: 16.0 + separation,
                y: 24.0,
            },
        ],
        peak: 1000.0,
        sigma: 1.5,
        background: 0.0,
        pixel_size_um: 0.1,
        frame_duration_s: 0.01,
    })
    .unwrap()
}

pub fn spot_counter(noise_tolerance: f64, box_size: usize) -> SpotCounter {
    SpotCounter::new(SpotCounterConfig {
        detector: SpotDetectorConfig {
            noise_tolerance,
            box_size,
            prefilter: PreFilter::None,
        },
        metric: SpotMetric::Count,
    })
    .unwrap()
}

/// Noise-free source whose number of visible spots follows the control
/// signal: `round(signal)` spots, clamped to the grid capacity.
pub struct ResponsiveSpotSource {
    grid: usize,
    spacing: usize,
    control_signal: f64,
    stack: Vec<Frame>,
    visible: Vec<f64>,
}

impl ResponsiveSpotSource {
    pub fn new(grid: usize, spacing: usize) -> Self {
        Self {
            grid,
            spacing,
            control_signal: 0.0,
            stack: Vec::new(),
            visible: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.grid * self.grid
    }

    fn side(&self) -> usize {
        (self.grid + 1) * self.spacing
    }
}

impl ImageSource for ResponsiveSpotSource {
    fn name(&self) -> &str {
        "ResponsiveSpotSource"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![("capacity".to_string(), self.capacity() as f64)]
    }

    fn frame_shape(&self) -> (usize, usize) {
        (self.side(), self.side())
    }

    fn next_image(&mut self) -> SimResult<Frame> {
        let n = (self.control_signal.max(0.0).round() as usize).min(self.capacity());
        let mut pixels = Array2::zeros((self.side(), self.side()));
        for idx in 0..n {
            let x = ((idx % self.grid) + 1) * self.spacing;
            let y = ((idx / self.grid) + 1) * self.spacing;
            add_gaussian_spot(&mut pixels, x as f64, y as f64, 1000.0, 1.5);
        }
        let frame = Frame::new(pixels);
        self.visible.push(n as f64);
        self.stack.push(frame.clone());
        Ok(frame)
    }

    fn set_control_signal(&mut self, value: f64) {
        self.control_signal = value;
    }

    fn control_signal(&self) -> f64 {
        self.control_signal
    }

    fn true_signal(&self, image_no: usize) -> Option<f64> {
        image_no
            .checked_sub(1)
            .and_then(|idx| self.visible.get(idx).copied())
    }

    fn short_true_signal_description(&self) -> &str {
        "visible-spots"
    }

    fn object_space_pixel_size(&self) -> f64 {
        0.1
    }

    fn frame_duration(&self) -> f64 {
        0.01
    }

    fn image_count(&self) -> usize {
        self.stack.len()
    }

    fn increment_time_step(&mut self) {}

    fn stack(&self) -> &[Frame] {
        &self.stack
    }
}

/// Wraps a source and shrinks its frames by one column from frame `break_at` on.
pub struct ShapeShiftingSource {
    inner: StaticSpotSource,
    break_at: usize,
}

impl ShapeShiftingSource {
    pub fn new(inner: StaticSpotSource, break_at: usize) -> Self {
        Self { inner, break_at }
    }
}

impl ImageSource for ShapeShiftingSource {
    fn name(&self) -> &str {
        "ShapeShiftingSource"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        self.inner.parameters()
    }

    fn frame_shape(&self) -> (usize, usize) {
        self.inner.frame_shape()
    }

    fn next_image(&mut self) -> SimResult<Frame> {
        let frame = self.inner.next_image()?;
        if self.inner.image_count() < self.break_at {
            return Ok(frame);
        }
        let (width, height) = frame.shape();
        let pixels = frame.into_pixels();
        let cropped = pixels.slice(ndarray::s![.., ..width - 1]).to_owned();
        debug_assert_eq!(cropped.dim(), (height, width - 1));
        Ok(Frame::new(cropped))
    }

    fn set_control_signal(&mut self, value: f64) {
        self.inner.set_control_signal(value);
    }

    fn control_signal(&self) -> f64 {
        self.inner.control_signal()
    }

    fn true_signal(&self, image_no: usize) -> Option<f64> {
        self.inner.true_signal(image_no)
    }

    fn short_true_signal_description(&self) -> &str {
        self.inner.short_true_signal_description()
    }

    fn object_space_pixel_size(&self) -> f64 {
        self.inner.object_space_pixel_size()
    }

    fn frame_duration(&self) -> f64 {
        self.inner.frame_duration()
    }

    fn image_count(&self) -> usize {
        self.inner.image_count()
    }

    fn increment_time_step(&mut self) {
        self.inner.increment_time_step();
    }

    fn stack(&self) -> &[Frame] {
        self.inner.stack()
    }
}

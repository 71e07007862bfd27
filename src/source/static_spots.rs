//! Noise-free source of fixed Gaussian spots

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::ImageSource;
use crate::error::{SimResult, SimulationError};
use crate::image_proc::Frame;

/// One Gaussian spot, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticSpot {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticSpotConfig {
    pub width_px: usize,
    pub height_px: usize,
    pub spots: Vec<StaticSpot>,
    /// Peak height of every spot above background
    pub peak: f64,
    /// Gaussian sigma in pixels
    pub sigma: f64,
    pub background: f64,
    /// Object-space pixel size in micrometers
    pub pixel_size_um: f64,
    /// Exposure of one frame in seconds
    pub frame_duration_s: f64,
}

impl Default for StaticSpotConfig {
    fn default() -> Self {
        Self {
            width_px: 64,
            height_px: 64,
            spots: vec![StaticSpot { x: 22.0, y: 32.0 }, StaticSpot { x: 42.0, y: 32.0 }],
            peak: 1000.0,
            sigma: 1.5,
            background: 0.0,
            pixel_size_um: 0.1,
            frame_duration_s: 0.01,
        }
    }
}

/// Renders the same spots into every frame regardless of the control signal.
#[derive(Debug, Clone)]
pub struct StaticSpotSource {
    config: StaticSpotConfig,
    template: Array2<f64>,
    control_signal: f64,
    stack: Vec<Frame>,
    time_step: usize,
}

impl StaticSpotSource {
    pub fn new(config: StaticSpotConfig) -> SimResult<Self> {
        if config.width_px == 0 || config.height_px == 0 {
            return Err(SimulationError::config("static source frame must be non-empty"));
        }
        if !(config.sigma.is_finite() && config.sigma > 0.0) {
            return Err(SimulationError::config(format!(
                "spot sigma must be positive, got {}",
                config.sigma
            )));
        }

        let two_sigma_sq = 2.0 * config.sigma * config.sigma;
        let template = Array2::from_shape_fn((config.height_px, config.width_px), |(row, col)| {
            config.background
                + config
                    .spots
                    .iter()
                    .map(|spot| {
                        let d2 = (col as f64 - spot.x).powi(2) + (row as f64 - spot.y).powi(2);
                        config.peak * (-d2 / two_sigma_sq).exp()
                    })
                    .sum::<f64>()
        });

        Ok(Self {
            config,
            template,
            control_signal: 0.0,
            stack: Vec::new(),
            time_step: 0,
        })
    }

    pub fn config(&self) -> &StaticSpotConfig {
        &self.config
    }

}

impl ImageSource for StaticSpotSource {
    fn name(&self) -> &str {
        "StaticSpotSource"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("spots".to_string(), self.config.spots.len() as f64),
            ("peak".to_string(), self.config.peak),
            ("sigma".to_string(), self.config.sigma),
            ("background".to_string(), self.config.background),
        ]
    }

    fn frame_shape(&self) -> (usize, usize) {
        (self.config.width_px, self.config.height_px)
    }

    fn next_image(&mut self) -> SimResult<Frame> {
        let frame = Frame::new(self.template.clone());
        self.stack.push(frame.clone());
        self.time_step += 1;
        Ok(frame)
    }

    fn set_control_signal(&mut self, value: f64) {
        self.control_signal = value;
    }

    fn control_signal(&self) -> f64 {
        self.control_signal
    }

    fn true_signal(&self, image_no: usize) -> Option<f64> {
        (1..=self.stack.len())
            .contains(&image_no)
            .then_some(self.config.spots.len() as f64)
    }

    fn short_true_signal_description(&self) -> &str {
        "spots"
    }

    fn object_space_pixel_size(&self) -> f64 {
        self.config.pixel_size_um
    }

    fn frame_duration(&self) -> f64 {
        self.config.frame_duration_s
    }

    fn image_count(&self) -> usize {
        self.stack.len()
    }

    fn increment_time_step(&mut self) {
        self.time_step += 1;
    }

    fn stack(&self) -> &[Frame] {
        &self.stack
    }

    fn time_step(&self) -> usize {
        self.time_step
    }
}

//! Static obstructions drawn into every frame

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::hardware::CameraModel;
use crate::image_proc::render::{stamp_kernel, PointEmission};

/// Something drawn onto the expected-photon map of every frame.
pub trait Obstructor {
    /// Draw the obstruction onto `pixels` (expected photons, `[row, col]`).
    fn apply_to(&self, pixels: &mut Array2<f64>);
}

/// Position and brightness of a gold bead fiducial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoldBeadConfig {
    /// Column in pixels
    pub x: f64,
    /// Row in pixels
    pub y: f64,
    /// Expected photons collected per frame
    pub photons: f64,
}

/// A bright, non-blinking, non-bleaching point scatterer.
#[derive(Debug, Clone)]
pub struct GoldBead {
    config: GoldBeadConfig,
    kernel: Array2<f64>,
}

impl GoldBead {
    /// Bead imaged through the camera's pixel-space PSF.
    pub fn new(config: GoldBeadConfig, camera: &CameraModel) -> SimResult<Self> {
        if !(config.photons.is_finite() && config.photons >= 0.0) {
            return Err(SimulationError::config(format!(
                "gold bead brightness must be non-negative, got {}",
                config.photons
            )));
        }
        Ok(Self {
            config,
            kernel: camera.psf_digital().clone(),
        })
    }

    pub fn config(&self) -> &GoldBeadConfig {
        &self.config
    }

    pub fn kernel(&self) -> ArrayView2<'_, f64> {
        self.kernel.view()
    }
}

impl Obstructor for GoldBead {
    fn apply_to(&self, pixels: &mut Array2<f64>) {
        stamp_kernel(
            pixels,
            &self.kernel.view(),
            PointEmission {
                x: self.config.x,
                y: self.config.y,
                photons: self.config.photons,
            },
        );
    }
}

//! Camera configuration and the derived PSF / sensor-noise model
//!
//! A [`CameraConfig`] holds the raw optical and sensor parameters of the
//! simulated microscope. [`CameraModel::new`] turns it, once per
//! configuration, into the constants the frame generator needs: the
//! diffraction-limited spot width, two Gaussian approximations of the Airy
//! disk (one in object space, one magnified onto the pixel grid) and the
//! per-frame photon→count conversion constants.
//!
//! # Units
//! - Lengths (wavelength, pixel pitch, object grid spacing) in micrometers
//! - Dark current in electrons per pixel per second
//! - Readout noise in electrons RMS
//! - Acquisition rate in frames per second

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::image_proc::convolve2d::{array_max, gaussian_peak_kernel, FWHM_TO_SIGMA};

/// Airy disk first-zero coefficient: r₀ = 0.61·λ/NA.
pub const AIRY_RADIUS_COEFFICIENT: f64 = 0.61;

/// Optical and sensor parameters of a simulated microscope camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame width in pixels
    pub width_px: usize,
    /// Frame height in pixels
    pub height_px: usize,
    /// Acquisition rate in frames per second
    pub acquisition_rate_hz: f64,
    /// Readout noise in electrons RMS
    pub readout_noise_e: f64,
    /// Dark current in electrons per pixel per second
    pub dark_current_e_p_s: f64,
    /// Quantum efficiency (0.0-1.0)
    pub quantum_efficiency: f64,
    /// Analog gain in counts per electron
    pub gain: f64,
    /// Physical pixel pitch in micrometers
    pub pixel_size_um: f64,
    /// Objective numerical aperture
    pub numerical_aperture: f64,
    /// Emission wavelength in micrometers
    pub wavelength_um: f64,
    /// Objective magnification
    pub magnification: f64,
    /// Object-space grid spacing in micrometers used by the emitter model
    pub object_grid_spacing_um: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width_px: 128,
            height_px: 128,
            acquisition_rate_hz: 100.0,
            readout_noise_e: 1.6,
            dark_current_e_p_s: 0.06,
            quantum_efficiency: 0.8,
            gain: 6.0,
            pixel_size_um: 6.45,
            numerical_aperture: 1.3,
            wavelength_um: 0.600,
            magnification: 100.0,
            object_grid_spacing_um: 0.0645,
        }
    }
}

impl CameraConfig {
    /// Check that every parameter is physically meaningful.
    pub fn validate(&self) -> SimResult<()> {
        if self.width_px == 0 || self.height_px == 0 {
            return Err(SimulationError::config(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width_px, self.height_px
            )));
        }

        let strictly_positive = [
            ("acquisition_rate_hz", self.acquisition_rate_hz),
            ("gain", self.gain),
            ("pixel_size_um", self.pixel_size_um),
            ("numerical_aperture", self.numerical_aperture),
            ("wavelength_um", self.wavelength_um),
            ("magnification", self.magnification),
            ("object_grid_spacing_um", self.object_grid_spacing_um),
        ];
        for (name, value) in strictly_positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimulationError::config(format!(
                    "camera.{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("readout_noise_e", self.readout_noise_e),
            ("dark_current_e_p_s", self.dark_current_e_p_s),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulationError::config(format!(
                    "camera.{name} must be non-negative, got {value}"
                )));
            }
        }

        if !(self.quantum_efficiency > 0.0 && self.quantum_efficiency <= 1.0) {
            return Err(SimulationError::config(format!(
                "camera.quantum_efficiency must be in (0, 1], got {}",
                self.quantum_efficiency
            )));
        }

        Ok(())
    }

    /// Pixel size projected back into object space (µm).
    pub fn object_space_pixel_size(&self) -> f64 {
        self.pixel_size_um / self.magnification
    }

    /// Exposure of a single frame in seconds.
    pub fn frame_duration_s(&self) -> f64 {
        1.0 / self.acquisition_rate_hz
    }

    /// Settings as ordered `key → value` pairs for report headers.
    pub fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("width".to_string(), self.width_px as f64),
            ("height".to_string(), self.height_px as f64),
            ("acq-rate".to_string(), self.acquisition_rate_hz),
            ("readout-noise".to_string(), self.readout_noise_e),
            ("dark-current".to_string(), self.dark_current_e_p_s),
            ("quantum-efficiency".to_string(), self.quantum_efficiency),
            ("gain".to_string(), self.gain),
            ("pixel-size".to_string(), self.pixel_size_um),
            ("NA".to_string(), self.numerical_aperture),
            ("wavelength".to_string(), self.wavelength_um),
            ("magnification".to_string(), self.magnification),
        ]
    }
}

/// PSF kernels and photon conversion constants derived from a [`CameraConfig`].
///
/// Built once per configuration and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct CameraModel {
    config: CameraConfig,
    /// Airy first-zero radius in object space (µm)
    airy_radius_um: f64,
    /// Spot FWHM in object-grid units
    fwhm: f64,
    /// Spot FWHM in pixels after magnification
    fwhm_digital: f64,
    /// Object-space kernel, rescaled to the pixel-space peak
    psf: Array2<f64>,
    /// Pixel-space kernel
    psf_digital: Array2<f64>,
    /// Thermal electrons per pixel per frame
    thermal_noise: f64,
    /// Counts per incident photon (QE × gain)
    quantum_gain: f64,
}

impl CameraModel {
    /// Derive the PSF kernels and conversion constants.
    ///
    /// Both kernels are square with side `2·⌊fwhm_digital⌋ + 1` and share the
    /// same peak amplitude, so photon bookkeeping does not depend on the space a
    /// convolution happens in.
    ///
    /// # Errors
    /// `InvalidConfig` if a parameter is out of range or a kernel would not be
    /// odd-sized.
    pub fn new(config: CameraConfig) -> SimResult<Self> {
        config.validate()?;

        let airy_radius_um = AIRY_RADIUS_COEFFICIENT * config.wavelength_um
            / config.numerical_aperture;
        let airy_radius_image_um = airy_radius_um * config.magnification;

        let fwhm = airy_radius_um / config.object_grid_spacing_um;
        let fwhm_digital = airy_radius_image_um / config.pixel_size_um;

        // Kernel half-width may not exceed the frame
        let max_extent = config.width_px.max(config.height_px);
        if !(fwhm_digital.is_finite() && fwhm_digital.floor() <= max_extent as f64) {
            return Err(SimulationError::config(format!(
                "PSF width of {fwhm_digital} px exceeds the {}x{} frame; check pixel_size_um and magnification",
                config.width_px, config.height_px
            )));
        }
        let psf_size = 2 * fwhm_digital.floor() as usize + 1;

        let psf_digital = gaussian_peak_kernel(psf_size, fwhm_digital / FWHM_TO_SIGMA)?;
        let psf_object = gaussian_peak_kernel(psf_size, fwhm / FWHM_TO_SIGMA)?;
        let scale = array_max(&psf_digital.view()) / array_max(&psf_object.view());
        let psf = psf_object.mapv(|v| v * scale);

        let thermal_noise = config.dark_current_e_p_s / config.acquisition_rate_hz;
        let quantum_gain = config.quantum_efficiency * config.gain;

        Ok(Self {
            config,
            airy_radius_um,
            fwhm,
            fwhm_digital,
            psf,
            psf_digital,
            thermal_noise,
            quantum_gain,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Frame size as (width, height).
    pub fn frame_shape(&self) -> (usize, usize) {
        (self.config.width_px, self.config.height_px)
    }

    pub fn airy_radius_um(&self) -> f64 {
        self.airy_radius_um
    }

    pub fn fwhm(&self) -> f64 {
        self.fwhm
    }

    pub fn fwhm_digital(&self) -> f64 {
        self.fwhm_digital
    }

    /// Object-space PSF kernel, rescaled to the peak of [`Self::psf_digital`].
    ///
    /// Frames are rendered on the pixel grid with the digital kernel; this one
    /// is kept for callers working on the object-space emitter grid and for
    /// checking that both kernels agree in peak amplitude.
    pub fn psf(&self) -> &Array2<f64> {
        &self.psf
    }

    /// Pixel-space PSF kernel.
    pub fn psf_digital(&self) -> &Array2<f64> {
        &self.psf_digital
    }

    /// Thermal electrons per pixel accumulated in one frame.
    pub fn thermal_noise(&self) -> f64 {
        self.thermal_noise
    }

    /// Counts produced per incident photon.
    pub fn quantum_gain(&self) -> f64 {
        self.quantum_gain
    }

    pub fn readout_noise(&self) -> f64 {
        self.config.readout_noise_e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_point_symmetric(kernel: &Array2<f64>) {
        let (rows, cols) = kernel.dim();
        for r in 0..rows {
            for c in 0..cols {
                assert_relative_eq!(
                    kernel[[r, c]],
                    kernel[[rows - 1 - r, cols - 1 - c]],
                    epsilon = 1e-15
                );
            }
        }
    }

    #[test]
    fn test_default_model_constants() {
        let model = CameraModel::new(CameraConfig::default()).unwrap();

        // 0.61 * 0.6 / 1.3
        assert_relative_eq!(model.airy_radius_um(), 0.281_538_461_5, epsilon = 1e-9);
        assert_relative_eq!(model.thermal_noise(), 0.06 / 100.0);
        assert_relative_eq!(model.quantum_gain(), 0.8 * 6.0);
        assert_eq!(model.psf_digital().dim(), (9, 9));
    }

    #[test]
    fn test_kernels_are_odd_symmetric_with_equal_peaks() {
        let configs = [
            CameraConfig::default(),
            CameraConfig {
                wavelength_um: 0.45,
                numerical_aperture: 0.9,
                magnification: 60.0,
                object_grid_spacing_um: 0.03,
                ..CameraConfig::default()
            },
            CameraConfig {
                pixel_size_um: 16.0,
                magnification: 150.0,
                ..CameraConfig::default()
            },
        ];

        for config in configs {
            let model = CameraModel::new(config).unwrap();
            let (rows, cols) = model.psf_digital().dim();
            assert_eq!(rows, cols);
            assert_eq!(rows % 2, 1);
            assert_eq!(model.psf().dim(), model.psf_digital().dim());

            assert_point_symmetric(model.psf());
            assert_point_symmetric(model.psf_digital());

            assert_relative_eq!(
                array_max(&model.psf().view()),
                array_max(&model.psf_digital().view()),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_sub_pixel_psf_gives_single_pixel_kernel() {
        let config = CameraConfig {
            magnification: 10.0,
            ..CameraConfig::default()
        };
        let model = CameraModel::new(config).unwrap();
        assert!(model.fwhm_digital() < 1.0);
        assert_eq!(model.psf_digital().dim(), (1, 1));
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let bad = [
            CameraConfig {
                numerical_aperture: 0.0,
                ..CameraConfig::default()
            },
            CameraConfig {
                acquisition_rate_hz: -1.0,
                ..CameraConfig::default()
            },
            CameraConfig {
                quantum_efficiency: 1.5,
                ..CameraConfig::default()
            },
            CameraConfig {
                readout_noise_e: f64::NAN,
                ..CameraConfig::default()
            },
            CameraConfig {
                width_px: 0,
                ..CameraConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                CameraModel::new(config),
                Err(SimulationError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_psf_wider_than_frame_is_rejected() {
        let tiny_pixels = CameraConfig {
            pixel_size_um: 1e-300,
            ..CameraConfig::default()
        };
        assert!(matches!(
            CameraModel::new(tiny_pixels),
            Err(SimulationError::InvalidConfig(_))
        ));

        // Default optics give a 4.37 px FWHM: fits an 8 px frame, not a 3 px one
        let small = |side| CameraConfig {
            width_px: side,
            height_px: side,
            ..CameraConfig::default()
        };
        assert!(CameraModel::new(small(8)).is_ok());
        assert!(CameraModel::new(small(3)).is_err());
    }

    #[test]
    fn test_object_space_pixel_size() {
        let config = CameraConfig::default();
        assert_relative_eq!(config.object_space_pixel_size(), 0.0645);
    }
}

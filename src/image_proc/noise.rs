//! Sensor noise pipeline turning expected photon counts into camera counts
//!
//! Per pixel, in order:
//! 1. Shot noise: Poisson draw around the expected photon count
//! 2. Thermal electrons: Poisson draw around the per-frame dark signal
//! 3. Conversion to counts by the combined quantum gain (QE × gain)
//! 4. Readout noise: zero-mean Gaussian with the sensor's RMS
//!
//! The result is clamped at zero.

use ndarray::{Array2, ArrayView2};
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};

use crate::hardware::CameraModel;

/// Draw from a Poisson distribution, treating a non-positive mean as zero.
pub fn sample_poisson<R: Rng + ?Sized>(rng: &mut R, mean: f64) -> f64 {
    if !(mean.is_finite() && mean > 0.0) {
        return 0.0;
    }
    match Poisson::new(mean) {
        Ok(dist) => dist.sample(rng),
        Err(_) => 0.0,
    }
}

/// Apply the full sensor pipeline to a map of expected photons per pixel.
pub fn apply_sensor_noise<R: Rng + ?Sized>(
    expected_photons: &ArrayView2<f64>,
    camera: &CameraModel,
    rng: &mut R,
) -> Array2<f64> {
    let thermal_mean = camera.thermal_noise();
    let quantum_gain = camera.quantum_gain();
    // validated non-negative and finite at CameraModel construction
    let readout = Normal::new(0.0, camera.readout_noise()).ok();

    let mut counts = Array2::zeros(expected_photons.dim());
    for (out, &photons) in counts.iter_mut().zip(expected_photons.iter()) {
        let shot = sample_poisson(rng, photons);
        let thermal = sample_poisson(rng, thermal_mean);
        let read = readout.map_or(0.0, |dist| dist.sample(rng));
        *out = ((shot + thermal) * quantum_gain + read).max(0.0);
    }
    counts
}

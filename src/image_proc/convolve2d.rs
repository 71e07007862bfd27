//! 2D convolution and Gaussian kernels for PSF synthesis and pre-filtering
//!
//! Kernels here are peak-normalized (center value equals the requested peak)
//! rather than sum-normalized, so that kernels built in different units can
//! be compared pixel for pixel.

use ndarray::{Array2, ArrayView2};

use crate::error::{SimResult, SimulationError};

/// Ratio between a Gaussian's FWHM and its standard deviation, 2·√(2·ln 2).
pub const FWHM_TO_SIGMA: f64 = 2.354_820_045_030_949;

/// Zero-padded 2D convolution that keeps the input size.
///
/// The kernel must be odd-sized in both dimensions so that it has a
/// well-defined center.
pub fn convolve2d_same(image: &ArrayView2<f64>, kernel: &ArrayView2<f64>) -> Array2<f64> {
    let (img_rows, img_cols) = image.dim();
    let (ker_rows, ker_cols) = kernel.dim();
    debug_assert!(ker_rows % 2 == 1 && ker_cols % 2 == 1);

    let pad_rows = (ker_rows / 2) as isize;
    let pad_cols = (ker_cols / 2) as isize;

    let mut output = Array2::zeros((img_rows, img_cols));
    for i in 0..img_rows {
        for j in 0..img_cols {
            let mut sum = 0.0;
            for ki in 0..ker_rows {
                let img_row = i as isize + ki as isize - pad_rows;
                if img_row < 0 || img_row >= img_rows as isize {
                    continue;
                }
                for kj in 0..ker_cols {
                    let img_col = j as isize + kj as isize - pad_cols;
                    if img_col >= 0 && img_col < img_cols as isize {
                        sum += image[[img_row as usize, img_col as usize]] * kernel[[ki, kj]];
                    }
                }
            }
            output[[i, j]] = sum;
        }
    }

    output
}

/// Square, centered Gaussian kernel with a center value of exactly 1.0.
///
/// # Errors
/// `InvalidConfig` if `size` is even or zero, or if `sigma` is not a
/// positive finite number.
pub fn gaussian_peak_kernel(size: usize, sigma: f64) -> SimResult<Array2<f64>> {
    if size % 2 != 1 {
        return Err(SimulationError::config(format!(
            "Gaussian kernel size must be an odd integer, got {size}"
        )));
    }
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(SimulationError::config(format!(
            "Gaussian kernel sigma must be positive, got {sigma}"
        )));
    }

    let mid = (size / 2) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    Ok(Array2::from_shape_fn((size, size), |(row, col)| {
        let dy = row as isize - mid;
        let dx = col as isize - mid;
        (-((dx * dx + dy * dy) as f64) / two_sigma_sq).exp()
    }))
}

/// Gaussian kernel whose values sum to 1.0, for intensity-preserving blurs.
pub fn gaussian_unit_kernel(size: usize, sigma: f64) -> SimResult<Array2<f64>> {
    let mut kernel = gaussian_peak_kernel(size, sigma)?;
    let sum = kernel.sum();
    kernel.mapv_inplace(|v| v / sum);
    Ok(kernel)
}

/// Smallest odd kernel size covering ±3σ.
pub fn kernel_size_for_sigma(sigma: f64) -> usize {
    2 * (3.0 * sigma).ceil().max(1.0) as usize + 1
}

/// Largest value in an array (0.0 for an empty array).
pub fn array_max(arr: &ArrayView2<f64>) -> f64 {
    arr.iter().copied().fold(0.0_f64, f64::max)
}

//! Rendering of point emitters into expected-photon maps

use ndarray::{Array2, ArrayView2};

/// A point source to be rendered, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointEmission {
    /// Column of the emitter center
    pub x: f64,
    /// Row of the emitter center
    pub y: f64,
    /// Expected photons emitted during the frame
    pub photons: f64,
}

/// Add `photons × kernel / Σkernel` centered on the nearest pixel.
///
/// Parts of the kernel falling outside the frame are dropped, so flux is only
/// conserved for emitters at least half a kernel away from the border.
pub fn stamp_kernel(target: &mut Array2<f64>, kernel: &ArrayView2<f64>, emission: PointEmission) {
    let kernel_sum: f64 = kernel.sum();
    if kernel_sum <= 0.0 || emission.photons <= 0.0 {
        return;
    }
    let scale = emission.photons / kernel_sum;

    let (rows, cols) = target.dim();
    let (ker_rows, ker_cols) = kernel.dim();
    let center_row = emission.y.round() as isize;
    let center_col = emission.x.round() as isize;
    let half_rows = (ker_rows / 2) as isize;
    let half_cols = (ker_cols / 2) as isize;

    for ki in 0..ker_rows {
        let row = center_row + ki as isize - half_rows;
        if row < 0 || row >= rows as isize {
            continue;
        }
        for kj in 0..ker_cols {
            let col = center_col + kj as isize - half_cols;
            if col >= 0 && col < cols as isize {
                target[[row as usize, col as usize]] += kernel[[ki, kj]] * scale;
            }
        }
    }
}

/// Render a set of emitters on top of a uniform background.
pub fn render_emissions(
    shape: (usize, usize),
    background: f64,
    kernel: &ArrayView2<f64>,
    emissions: &[PointEmission],
) -> Array2<f64> {
    let (width, height) = shape;
    let mut expected = Array2::from_elem((height, width), background.max(0.0));
    for &emission in emissions {
        stamp_kernel(&mut expected, kernel, emission);
    }
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::convolve2d::gaussian_peak_kernel;
    use approx::assert_relative_eq;

    #[test]
    fn test_interior_stamp_conserves_photons() {
        let kernel = gaussian_peak_kernel(7, 1.2).unwrap();
        let expected = render_emissions(
            (32, 32),
            0.0,
            &kernel.view(),
            &[PointEmission {
                x: 16.0,
                y: 12.0,
                photons: 500.0,
            }],
        );

        assert_relative_eq!(expected.sum(), 500.0, epsilon = 1e-9);
        // Peak lands on the nearest pixel
        let peak = expected[[12, 16]];
        assert!(expected.iter().all(|&v| v <= peak));
    }

    #[test]
    fn test_edge_stamp_is_clipped() {
        let kernel = gaussian_peak_kernel(5, 1.0).unwrap();
        let mut target = Array2::zeros((10, 10));
        stamp_kernel(
            &mut target,
            &kernel.view(),
            PointEmission {
                x: 0.0,
                y: 0.0,
                photons: 100.0,
            },
        );
        assert!(target.sum() < 100.0);
        assert!(target[[0, 0]] > 0.0);
    }

    #[test]
    fn test_background_is_uniform() {
        let kernel = gaussian_peak_kernel(3, 1.0).unwrap();
        let expected = render_emissions((4, 3), 2.5, &kernel.view(), &[]);
        assert_eq!(expected.dim(), (3, 4));
        assert!(expected.iter().all(|&v| v == 2.5));
    }
}

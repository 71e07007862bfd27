//! Frame container and conversions to the image crate for persistence
//!
//! - **ndarray**: matrix indexing [row, col] = [y, x] with (height, width) dimensions
//! - **image crate**: graphics indexing (x, y) with (width, height) dimensions

use image::{ImageBuffer, Luma};
use ndarray::{Array2, ArrayView2};

/// 16-bit grayscale image type used for saved frames.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// One immutable camera frame of non-negative intensities.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pixels: Array2<f64>,
}

impl Frame {
    /// Wrap a pixel array; negative and non-finite values are clamped to 0.0.
    pub fn new(mut pixels: Array2<f64>) -> Self {
        pixels.mapv_inplace(|v| if v.is_finite() && v > 0.0 { v } else { 0.0 });
        Self { pixels }
    }

    /// All-zero frame of the given size.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self {
            pixels: Array2::zeros((height, width)),
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }

    /// Frame size as (width, height).
    pub fn shape(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.pixels.view()
    }

    pub fn pixels(&self) -> &Array2<f64> {
        &self.pixels
    }

    pub fn into_pixels(self) -> Array2<f64> {
        self.pixels
    }

    /// Brightest pixel value (0.0 for an empty frame).
    pub fn max(&self) -> f64 {
        self.pixels.iter().copied().fold(0.0, f64::max)
    }

    /// Round to 16-bit counts, saturating at `u16::MAX`.
    pub fn to_u16(&self) -> Array2<u16> {
        self.pixels
            .mapv(|v| v.round().clamp(0.0, u16::MAX as f64) as u16)
    }

    /// Convert to a 16-bit grayscale image, swapping to (x, y) indexing.
    pub fn to_gray16_image(&self) -> Gray16Image {
        array2_to_gray16_image(&self.to_u16())
    }
}

/// Convert `Array2<u16>` to a 16-bit grayscale image.
pub fn array2_to_gray16_image(arr: &Array2<u16>) -> Gray16Image {
    let (height, width) = arr.dim();
    let mut img = Gray16Image::new(width as u32, height as u32);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Luma([arr[[y as usize, x as usize]]]);
    }
    img
}

/// Convert a 16-bit grayscale image back into a [`Frame`].
pub fn gray16_image_to_frame(img: &Gray16Image) -> Frame {
    let (width, height) = img.dimensions();
    let pixels = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        img.get_pixel(x as u32, y as u32)[0] as f64
    });
    Frame::new(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_frame_clamps_negative_and_nan() {
        let frame = Frame::new(array![[-1.0, 2.0], [f64::NAN, 4.5]]);
        assert_eq!(frame.pixels(), &array![[0.0, 2.0], [0.0, 4.5]]);
        assert_eq!(frame.max(), 4.5);
    }

    #[test]
    fn test_frame_shape_is_width_height() {
        let frame = Frame::zeros(7, 3);
        assert_eq!(frame.shape(), (7, 3));
        assert_eq!(frame.view().dim(), (3, 7));
    }

    #[test]
    fn test_to_u16_saturates() {
        let frame = Frame::new(array![[1.4, 70000.0]]);
        assert_eq!(frame.to_u16(), array![[1u16, u16::MAX]]);
    }

    #[test]
    fn test_gray16_conversion_preserves_orientation() {
        let frame = Frame::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let img = frame.to_gray16_image();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 0)[0], 3);
        assert_eq!(img.get_pixel(0, 1)[0], 4);

        let back = gray16_image_to_frame(&img);
        assert_eq!(back, frame);
    }
}

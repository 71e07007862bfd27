//! Image processing: kernels, frames, sensor noise, rendering and detection

pub mod convolve2d;
pub mod detection;
pub mod image;
pub mod noise;
pub mod render;

pub use convolve2d::{convolve2d_same, gaussian_peak_kernel, gaussian_unit_kernel};
pub use detection::{SpotDetector, SpotDetectorConfig, SpotRegion, SpotStatistics};
pub use image::Frame;
pub use noise::apply_sensor_noise;
pub use render::{render_emissions, stamp_kernel, PointEmission};

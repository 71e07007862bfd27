//! Microscope camera hardware model

pub mod camera;

pub use camera::{CameraConfig, CameraModel};

//! Image sources: the simulated microscope seen by the closed loop
//!
//! An [`ImageSource`] produces one frame per call, parameterized by the
//! control signal most recently pushed to it, and knows the ground truth it
//! rendered so runs can be scored afterwards.

pub mod fluorophores;
pub mod obstructors;
pub mod state;
pub mod static_spots;

use std::path::{Path, PathBuf};

use crate::error::SimResult;
use crate::hardware::CameraConfig;
use crate::image_proc::Frame;
use crate::io::stack;

pub use fluorophores::{EmitterState, FluorophoreConfig, FluorophoreSource};
pub use obstructors::{GoldBead, GoldBeadConfig, Obstructor};
pub use state::{EmitterCounts, SourceMessage, SourceState};
pub use static_spots::{StaticSpot, StaticSpotConfig, StaticSpotSource};

/// A stateful, non-reentrant generator of frames.
pub trait ImageSource {
    fn name(&self) -> &str;

    /// Settings as ordered `key → value` pairs for report headers.
    fn parameters(&self) -> Vec<(String, f64)>;

    /// Size of every frame this source produces, as (width, height).
    fn frame_shape(&self) -> (usize, usize);

    /// Generate the next frame and append it to the stack.
    fn next_image(&mut self) -> SimResult<Frame>;

    /// Set the actuation value used for subsequent frames.
    fn set_control_signal(&mut self, value: f64);

    fn control_signal(&self) -> f64;

    /// Ground truth behind image `image_no` (1-based), if known.
    fn true_signal(&self, image_no: usize) -> Option<f64>;

    /// Short label for the ground-truth quantity.
    fn short_true_signal_description(&self) -> &str;

    /// Pixel size projected into object space, in micrometers.
    fn object_space_pixel_size(&self) -> f64;

    /// Exposure of one frame in seconds.
    fn frame_duration(&self) -> f64;

    /// Number of frames generated so far.
    fn image_count(&self) -> usize;

    /// Advance the simulated time by one frame without producing an image.
    fn increment_time_step(&mut self);

    /// All frames generated so far, oldest first.
    fn stack(&self) -> &[Frame];

    /// Write the stack as numbered 16-bit TIFF files into `dir`.
    fn save_stack(&self, dir: &Path) -> SimResult<Vec<PathBuf>> {
        stack::save_stack(self.stack(), dir)
    }

    /// Camera behind this source, if it models one.
    fn camera_config(&self) -> Option<&CameraConfig> {
        None
    }

    /// Time steps elapsed, including those taken without an image.
    fn time_step(&self) -> usize {
        self.image_count()
    }

    /// Area of the field of view in object space, in square micrometers.
    fn fov_size(&self) -> f64 {
        let (width, height) = self.frame_shape();
        let pixel = self.object_space_pixel_size();
        width as f64 * height as f64 * pixel * pixel
    }

    /// Emitter population per state, for sources that model one.
    fn emitter_counts(&self) -> Option<EmitterCounts> {
        None
    }

    /// Snapshot of the source's current state.
    fn state(&self) -> SourceState {
        SourceState {
            source: self.name().to_string(),
            time_step: self.time_step(),
            image_count: self.image_count(),
            control_signal: self.control_signal(),
            fov_size: self.fov_size(),
            emitters: self.emitter_counts(),
            camera: self.camera_config().cloned(),
        }
    }

    /// Write [`ImageSource::state`] to `path` as JSON.
    fn save_state(&self, path: &Path) -> SimResult<()> {
        self.state().save(path)
    }

    /// Messages logged since the last [`ImageSource::take_messages`].
    fn messages(&self) -> &[SourceMessage] {
        &[]
    }

    /// Hand over the logged messages and clear the log.
    fn take_messages(&mut self) -> Vec<SourceMessage> {
        Vec::new()
    }

    /// Write the logged messages to `path` as a JSON array, keeping the log.
    fn save_messages(&self, path: &Path) -> SimResult<()> {
        state::save_messages(self.messages(), path)
    }
}

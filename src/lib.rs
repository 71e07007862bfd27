//! Closed-loop simulation of single-molecule localization microscopy
//!
//! A synthetic microscope produces one noisy frame per time step, an analyzer
//! reduces each frame to a scalar statistic, and a feedback controller turns
//! that statistic into the actuation signal (activation laser power) used for
//! the following frames. Runs are recorded step by step and can be written
//! out as a CSV report and a stack of 16-bit TIFF frames.

pub mod analyzers;
pub mod config;
pub mod controllers;
pub mod error;
pub mod hardware;
pub mod image_proc;
pub mod io;
pub mod manager;
pub mod sims;
pub mod source;

// Re-exports for easier access
pub use analyzers::{Analyzer, SpotCounter, SpotCounterConfig, SpotMetric};
pub use config::{RunConfig, SimulationConfig};
pub use controllers::{
    Controller, ControllerConfig, OutputBounds, PidController, ProportionalController,
};
pub use error::{SimResult, SimulationError};
pub use hardware::{CameraConfig, CameraModel};
pub use image_proc::detection::{SpotDetector, SpotDetectorConfig, SpotStatistics};
pub use image_proc::Frame;
pub use io::ReportTable;
pub use manager::SimulationContext;
pub use sims::{AlgorithmTester, ClosedLoopSimulator, History, HistoryRecord};
pub use source::{
    FluorophoreConfig, FluorophoreSource, ImageSource, SourceMessage, SourceState, StaticSpotSource,
};

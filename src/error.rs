use thiserror::Error;

/// Errors produced while configuring or running a closed-loop simulation.
///
/// Only two kinds matter to the loop itself: invalid parameters, which are
/// rejected while components are built, and inconsistent frame shapes, which
/// abort a run. Degenerate statistics (no spots, a single spot) are never
/// errors; they show up as `NaN` in the results.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Parameter validation failure (box size, gains, bounds, kernel size, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame did not have the dimensions the run was started with.
    #[error(
        "frame shape mismatch: expected {expected_width}x{expected_height}, got {width}x{height}"
    )]
    FrameShape {
        /// Width the source declared.
        expected_width: usize,
        /// Height the source declared.
        expected_height: usize,
        /// Width of the offending frame.
        width: usize,
        /// Height of the offending frame.
        height: usize,
    },

    /// A report row did not match the report's columns.
    #[error("report row for frame {frame_id} has {values} values, expected {columns}")]
    ReportRow {
        frame_id: usize,
        values: usize,
        columns: usize,
    },

    /// No simulator registered under this id.
    #[error("no simulator with id {0}")]
    UnknownSimulator(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimulationError {
    /// Shorthand for building an [`SimulationError::InvalidConfig`].
    pub fn config(msg: impl Into<String>) -> Self {
        SimulationError::InvalidConfig(msg.into())
    }

    /// True for errors that abort a run in progress.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, SimulationError::FrameShape { .. })
    }
}

/// Result type used throughout the crate.
pub type SimResult<T> = Result<T, SimulationError>;

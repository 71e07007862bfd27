//! Feedback controllers driving the image source's control signal
//!
//! A controller turns the analyzer's measurement into a new control value
//! (for fluorophore sources: the activation laser power). Implementations are
//! interchangeable behind [`Controller`] and chosen at construction time from
//! a [`ControllerConfig`].
//!
//! # Operation
//! 1. Build with [`ControllerConfig::build`] (parameters validated eagerly)
//! 2. Set the setpoint with [`Controller::set_target`]
//! 3. Call [`Controller::next_value`] at every refresh with the latest measurement
//! 4. Read back past outputs with [`Controller::history`]

pub mod pid;
pub mod proportional;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};

pub use pid::PidController;
pub use proportional::ProportionalController;

/// Capability shared by all feedback controllers.
pub trait Controller {
    fn name(&self) -> &str;

    /// Gains and bounds as ordered `key → value` pairs for report headers.
    fn parameters(&self) -> Vec<(String, f64)>;

    /// Change the value the measurement is driven toward. A non-finite
    /// setpoint is ignored.
    fn set_target(&mut self, setpoint: f64);

    /// Advance the control law with a new measurement and return the new
    /// bounded output.
    ///
    /// A non-finite measurement holds the output and the integral state; it
    /// still counts as an update.
    fn next_value(&mut self, measurement: f64) -> f64;

    /// Output currently in effect.
    fn current_output(&self) -> f64;

    fn setpoint(&self) -> f64;

    /// Output in effect before the `update_index`-th update (0-based), so
    /// index 0 is the initial output. `None` past the last update.
    fn history(&self, update_index: usize) -> Option<f64>;

    /// Number of updates performed so far.
    fn update_count(&self) -> usize;

    /// Clear internal state and return to the initial output.
    fn reset(&mut self);
}

/// Closed interval every controller output is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for OutputBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 10.0 }
    }
}

impl OutputBounds {
    pub fn new(min: f64, max: f64) -> SimResult<Self> {
        let bounds = Self { min, max };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(SimulationError::config(format!(
                "controller bounds must be finite, got [{}, {}]",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(SimulationError::config(format!(
                "controller lower bound {} exceeds upper bound {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    /// Clamp a raw control law value. An undefined (NaN) value, produced when
    /// the law overflows on extreme inputs, saturates toward the sign of the
    /// error, or holds `held` when the error is zero.
    pub fn clamp_or_saturate(&self, raw: f64, error: f64, held: f64) -> f64 {
        if !raw.is_nan() {
            return self.clamp(raw);
        }
        if error > 0.0 {
            self.max
        } else if error < 0.0 {
            self.min
        } else {
            self.clamp(held)
        }
    }
}

/// Reject gains that are negative or not finite.
pub(crate) fn validate_gains(gains: &[(&str, f64)]) -> SimResult<()> {
    for &(name, value) in gains {
        if !(value.is_finite() && value >= 0.0) {
            return Err(SimulationError::config(format!(
                "controller gain {name} must be non-negative, got {value}"
            )));
        }
    }
    Ok(())
}

/// Serializable controller selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerConfig {
    Proportional {
        kp: f64,
        #[serde(default)]
        bounds: OutputBounds,
        #[serde(default)]
        setpoint: f64,
        #[serde(default)]
        initial_output: f64,
    },
    Pid {
        kp: f64,
        #[serde(default)]
        ki: f64,
        #[serde(default)]
        kd: f64,
        #[serde(default)]
        bounds: OutputBounds,
        #[serde(default)]
        setpoint: f64,
        #[serde(default)]
        initial_output: f64,
    },
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig::Pid {
            kp: 0.02,
            ki: 0.005,
            kd: 0.0,
            bounds: OutputBounds::default(),
            setpoint: 10.0,
            initial_output: 0.1,
        }
    }
}

impl ControllerConfig {
    pub fn setpoint(&self) -> f64 {
        match *self {
            ControllerConfig::Proportional { setpoint, .. } => setpoint,
            ControllerConfig::Pid { setpoint, .. } => setpoint,
        }
    }

    /// Replace the setpoint the built controller starts with.
    pub fn set_setpoint(&mut self, value: f64) {
        match self {
            ControllerConfig::Proportional { setpoint, .. } => *setpoint = value,
            ControllerConfig::Pid { setpoint, .. } => *setpoint = value,
        }
    }

    /// Validate and build the configured controller.
    pub fn build(&self) -> SimResult<Box<dyn Controller>> {
        if !self.setpoint().is_finite() {
            return Err(SimulationError::config(format!(
                "controller setpoint must be finite, got {}",
                self.setpoint()
            )));
        }
        match *self {
            ControllerConfig::Proportional {
                kp,
                bounds,
                setpoint,
                initial_output,
            } => {
                let mut controller = ProportionalController::new(kp, bounds, initial_output)?;
                controller.set_target(setpoint);
                Ok(Box::new(controller))
            }
            ControllerConfig::Pid {
                kp,
                ki,
                kd,
                bounds,
                setpoint,
                initial_output,
            } => {
                let mut controller = PidController::new(kp, ki, kd, bounds, initial_output)?;
                controller.set_target(setpoint);
                Ok(Box::new(controller))
            }
        }
    }
}

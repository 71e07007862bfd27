//! Proportional feedback: output = clamp(Kp · (setpoint − measurement))

use log::warn;

use super::{validate_gains, Controller, OutputBounds};
use crate::error::SimResult;

#[derive(Debug, Clone)]
pub struct ProportionalController {
    kp: f64,
    bounds: OutputBounds,
    setpoint: f64,
    initial_output: f64,
    /// Output after each update, starting with the initial output
    outputs: Vec<f64>,
}

impl ProportionalController {
    /// # Errors
    /// `InvalidConfig` for a negative or non-finite gain or inconsistent bounds.
    pub fn new(kp: f64, bounds: OutputBounds, initial_output: f64) -> SimResult<Self> {
        validate_gains(&[("kp", kp)])?;
        bounds.validate()?;
        let initial_output = bounds.clamp(initial_output);
        Ok(Self {
            kp,
            bounds,
            setpoint: 0.0,
            initial_output,
            outputs: vec![initial_output],
        })
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn bounds(&self) -> OutputBounds {
        self.bounds
    }
}

impl Controller for ProportionalController {
    fn name(&self) -> &str {
        "ProportionalController"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("kp".to_string(), self.kp),
            ("min-output".to_string(), self.bounds.min),
            ("max-output".to_string(), self.bounds.max),
        ]
    }

    fn set_target(&mut self, setpoint: f64) {
        if !setpoint.is_finite() {
            warn!("{}: ignoring non-finite setpoint {setpoint}", self.name());
            return;
        }
        self.setpoint = setpoint;
    }

    fn next_value(&mut self, measurement: f64) -> f64 {
        let output = if measurement.is_finite() {
            let error = self.setpoint - measurement;
            // 0·inf when the error overflows
            self.bounds
                .clamp_or_saturate(self.kp * error, error, self.current_output())
        } else {
            warn!("{}: non-finite measurement {measurement}, holding output", self.name());
            self.current_output()
        };
        self.outputs.push(output);
        output
    }

    fn current_output(&self) -> f64 {
        self.outputs.last().copied().unwrap_or(self.initial_output)
    }

    fn setpoint(&self) -> f64 {
        self.setpoint
    }

    fn history(&self, update_index: usize) -> Option<f64> {
        self.outputs.get(update_index).copied()
    }

    fn update_count(&self) -> usize {
        self.outputs.len() - 1
    }

    fn reset(&mut self) {
        self.outputs = vec![self.initial_output];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn controller(kp: f64, min: f64, max: f64) -> ProportionalController {
        ProportionalController::new(kp, OutputBounds::new(min, max).unwrap(), 0.0).unwrap()
    }

    #[test]
    fn test_output_is_proportional_to_error() {
        let mut c = controller(0.5, -100.0, 100.0);
        c.set_target(10.0);
        assert_relative_eq!(c.next_value(4.0), 3.0);
        assert_relative_eq!(c.next_value(14.0), -2.0);
        assert_relative_eq!(c.current_output(), -2.0);
    }

    #[test]
    fn test_output_saturates() {
        let mut c = controller(1.0, 0.0, 5.0);
        c.set_target(10.0);
        assert_eq!(c.next_value(-1e12), 5.0);
        assert_eq!(c.next_value(1e12), 0.0);
    }

    #[test]
    fn test_history_indexes_outputs_before_each_update() {
        let mut c = controller(1.0, -10.0, 10.0);
        c.set_target(2.0);
        c.next_value(1.0);
        c.next_value(0.0);

        assert_eq!(c.update_count(), 2);
        assert_eq!(c.history(0), Some(0.0));
        assert_eq!(c.history(1), Some(1.0));
        assert_eq!(c.history(2), Some(2.0));
        assert_eq!(c.history(3), None);
    }

    #[test]
    fn test_non_finite_measurement_holds_output() {
        let mut c = controller(1.0, -10.0, 10.0);
        c.set_target(3.0);
        c.next_value(1.0);
        assert_eq!(c.next_value(f64::NAN), 2.0);
        assert_eq!(c.next_value(f64::INFINITY), 2.0);
    }

    #[test]
    fn test_overflowing_error_stays_within_bounds() {
        let mut c = controller(0.0, -1.0, 1.0);
        c.set_target(1e308);
        let output = c.next_value(-1e308);
        assert!((-1.0..=1.0).contains(&output), "output {output} left [-1, 1]");

        let mut c = controller(2.0, -1.0, 1.0);
        c.set_target(-1e308);
        assert_eq!(c.next_value(1e308), -1.0);
    }

    #[test]
    fn test_non_finite_setpoint_is_ignored() {
        let mut c = controller(1.0, -10.0, 10.0);
        c.set_target(4.0);
        c.set_target(f64::NAN);
        assert_eq!(c.setpoint(), 4.0);
        assert_relative_eq!(c.next_value(3.0), 1.0);
    }

    #[test]
    fn test_initial_output_is_clamped_and_restored_on_reset() {
        let mut c =
            ProportionalController::new(1.0, OutputBounds::new(0.0, 1.0).unwrap(), 3.0).unwrap();
        assert_eq!(c.current_output(), 1.0);
        c.set_target(0.0);
        c.next_value(0.5);
        c.reset();
        assert_eq!(c.current_output(), 1.0);
        assert_eq!(c.update_count(), 0);
    }

    #[test]
    fn test_rejects_invalid_gain() {
        assert!(ProportionalController::new(f64::NAN, OutputBounds::default(), 0.0).is_err());
        assert!(ProportionalController::new(-1.0, OutputBounds::default(), 0.0).is_err());
    }
}

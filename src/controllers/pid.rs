//! Discrete PID controller with clamping anti-windup
//!
//! One update per controller refresh, no time scaling:
//!
//! ```text
//! e[k]   = setpoint − measurement
//! I[k]   = I[k−1] + e[k]            (skipped while saturated, see below)
//! D[k]   = e[k] − e[k−1]            (0 on the first update)
//! u[k]   = clamp(Kp·e[k] + Ki·I[k] + Kd·D[k], min, max)
//! ```
//!
//! Anti-windup: when the unclamped output would cross a bound and the error
//! pushes further in that direction, the integral is not accumulated.
//! Accumulation resumes as soon as the error reverses or the output leaves
//! saturation.
//!
//! Extreme but finite measurements can overflow the individual terms. The
//! integral is then left untouched and an undefined law saturates toward the
//! sign of the error.

use log::{debug, warn};

use super::{validate_gains, Controller, OutputBounds};
use crate::error::SimResult;

#[derive(Debug, Clone)]
pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    bounds: OutputBounds,
    setpoint: f64,
    integral: f64,
    previous_error: Option<f64>,
    initial_output: f64,
    /// Output after each update, starting with the initial output
    outputs: Vec<f64>,
}

impl PidController {
    /// # Errors
    /// `InvalidConfig` for negative or non-finite gains or inconsistent bounds.
    pub fn new(
        kp: f64,
        ki: f64,
        kd: f64,
        bounds: OutputBounds,
        initial_output: f64,
    ) -> SimResult<Self> {
        validate_gains(&[("kp", kp), ("ki", ki), ("kd", kd)])?;
        bounds.validate()?;
        let initial_output = bounds.clamp(initial_output);
        Ok(Self {
            kp,
            ki,
            kd,
            bounds,
            setpoint: 0.0,
            integral: 0.0,
            previous_error: None,
            initial_output,
            outputs: vec![initial_output],
        })
    }

    /// Accumulated error sum.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn bounds(&self) -> OutputBounds {
        self.bounds
    }

    fn law(&self, error: f64, integral: f64, derivative: f64) -> f64 {
        self.kp * error + self.ki * integral + self.kd * derivative
    }
}

impl Controller for PidController {
    fn name(&self) -> &str {
        "PIDController"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("kp".to_string(), self.kp),
            ("ki".to_string(), self.ki),
            ("kd".to_string(), self.kd),
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
        if !measurement.is_finite() {
            warn!("{}: non-finite measurement {measurement}, holding output", self.name());
            let held = self.current_output();
            self.outputs.push(held);
            return held;
        }

        let error = self.setpoint - measurement;
        let derivative = self.previous_error.map_or(0.0, |prev| error - prev);
        let candidate = self.integral + error;
        let unclamped = self.law(error, candidate, derivative);

        let winding_up = (unclamped > self.bounds.max && error > 0.0)
            || (unclamped < self.bounds.min && error < 0.0);
        // Overflowing terms (inf − inf) leave the law undefined
        let undefined = unclamped.is_nan() || !candidate.is_finite();

        let raw = if winding_up || undefined {
            debug!("{}: output saturated, integral held at {}", self.name(), self.integral);
            self.law(error, self.integral, derivative)
        } else {
            self.integral = candidate;
            unclamped
        };
        let output = self
            .bounds
            .clamp_or_saturate(raw, error, self.current_output());

        self.previous_error = error.is_finite().then_some(error);
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
        self.integral = 0.0;
        self.previous_error = None;
        self.outputs = vec![self.initial_output];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// First-order plant: the measurement relaxes toward the applied output.
    fn drive_plant(controller: &mut PidController, alpha: f64, steps: usize) -> Vec<f64> {
        let mut measurement = 0.0;
        let mut trace = Vec::with_capacity(steps);
        for _ in 0..steps {
            let output = controller.next_value(measurement);
            measurement += alpha * (output - measurement);
            trace.push(measurement);
        }
        trace
    }

    fn pid(kp: f64, ki: f64, kd: f64, min: f64, max: f64) -> PidController {
        PidController::new(kp, ki, kd, OutputBounds::new(min, max).unwrap(), 0.0).unwrap()
    }

    #[test]
    fn test_proportional_only_approaches_without_oscillation() {
        let mut controller = pid(2.0, 0.0, 0.0, -100.0, 100.0);
        controller.set_target(10.0);

        let trace = drive_plant(&mut controller, 0.2, 60);

        for pair in trace.windows(2) {
            assert!(pair[1] >= pair[0], "measurement moved away from setpoint");
            assert!(pair[1] < 10.0);
        }
        // P-only settles at Kp·sp / (1 + Kp) for a unit-gain plant
        assert_relative_eq!(trace[59], 20.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_integral_removes_steady_state_error() {
        let mut controller = pid(0.5, 0.2, 0.0, -100.0, 100.0);
        controller.set_target(10.0);

        let trace = drive_plant(&mut controller, 0.2, 200);
        assert_relative_eq!(trace[199], 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_output_never_leaves_bounds() {
        let mut controller = pid(3.0, 1.0, 2.0, -1.5, 2.5);
        controller.set_target(0.0);
        for measurement in [1e9, -1e9, 0.0, 1e-3, -7.0, 1e300, -1e300, 42.0] {
            let output = controller.next_value(measurement);
            assert!((-1.5..=2.5).contains(&output), "output {output} out of bounds");
        }
    }

    #[test]
    fn test_anti_windup_releases_immediately_on_reversal() {
        let mut controller = pid(0.01, 0.1, 0.0, 0.0, 1.0);
        controller.set_target(100.0);

        // Long saturation at the upper bound
        for _ in 0..50 {
            assert_eq!(controller.next_value(0.0), 1.0);
        }
        assert_eq!(controller.integral(), 0.0);

        // Measurement overshoots: output must leave the upper bound at once
        let output = controller.next_value(200.0);
        assert_eq!(output, 0.0);
    }

    #[test]
    fn test_overflowing_terms_stay_within_bounds() {
        let mut controller = pid(3.0, 0.0, 3.0, -1.0, 1.0);
        controller.set_target(0.0);

        assert_eq!(controller.next_value(1.7e308), -1.0);
        // Kp·e and Kd·Δe overflow with opposite signs
        let output = controller.next_value(0.9e308);
        assert!((-1.0..=1.0).contains(&output), "output {output} left [-1, 1]");
        assert_eq!(output, -1.0);
        assert_eq!(controller.integral(), 0.0);

        let output = controller.next_value(-1e308);
        assert!((-1.0..=1.0).contains(&output), "output {output} left [-1, 1]");
    }

    #[test]
    fn test_integral_stays_finite_on_huge_errors() {
        let mut controller = pid(0.0, 1.0, 0.0, -5.0, 5.0);
        controller.set_target(1e308);
        controller.next_value(-1e308);
        controller.next_value(-1e308);
        assert!(controller.integral().is_finite());
        assert_eq!(controller.current_output(), 5.0);
    }

    #[test]
    fn test_non_finite_setpoint_is_ignored() {
        let mut controller = pid(1.0, 0.5, 0.0, -10.0, 10.0);
        controller.set_target(2.0);
        controller.set_target(f64::NAN);
        controller.set_target(f64::INFINITY);
        assert_eq!(controller.setpoint(), 2.0);

        let output = controller.next_value(3.0);
        assert!(output.is_finite());
        assert!((-10.0..=10.0).contains(&output));
    }

    #[test]
    fn test_derivative_is_zero_on_first_update() {
        let mut controller = pid(0.0, 0.0, 1.0, -100.0, 100.0);
        controller.set_target(5.0);

        assert_eq!(controller.next_value(0.0), 0.0);
        // error 5 → 2
        assert_relative_eq!(controller.next_value(3.0), -3.0);
    }

    #[test]
    fn test_non_finite_measurement_keeps_state() {
        let mut controller = pid(1.0, 0.5, 0.0, -100.0, 100.0);
        controller.set_target(4.0);
        let first = controller.next_value(2.0);
        let integral = controller.integral();

        assert_eq!(controller.next_value(f64::NAN), first);
        assert_eq!(controller.integral(), integral);
        assert_eq!(controller.history(2), Some(first));
    }

    #[test]
    fn test_reset_clears_integral_and_history() {
        let mut controller = pid(1.0, 1.0, 1.0, -100.0, 100.0);
        controller.set_target(1.0);
        controller.next_value(0.0);
        controller.next_value(0.5);
        controller.reset();

        let mut fresh = pid(1.0, 1.0, 1.0, -100.0, 100.0);
        fresh.set_target(1.0);
        assert_eq!(controller.next_value(0.0), fresh.next_value(0.0));
        assert_eq!(controller.update_count(), 1);
    }
}

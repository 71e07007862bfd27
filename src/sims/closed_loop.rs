//! Closed-loop simulation: source → analyzer → controller → source
//!
//! One step of the loop:
//!
//! 1. Ask the image source for a frame (generated with the control signal
//!    applied at the last refresh)
//! 2. Reduce the frame with the analyzer
//! 3. On every `refresh_period`-th step, hand the analyzer's batch output to
//!    the controller and push the new output to the source, where it takes
//!    effect from the next frame on
//! 4. Append a history record
//!
//! A frame whose size differs from the size the source declared aborts the
//! run with [`SimulationError::FrameShape`]; records collected before the
//! failure stay in [`ClosedLoopSimulator::history`].

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::history::{ControlSample, History, HistoryRecord};
use crate::analyzers::Analyzer;
use crate::controllers::Controller;
use crate::error::{SimResult, SimulationError};
use crate::image_proc::Frame;
use crate::io::report::ReportTable;
use crate::io::stack;
use crate::source::ImageSource;

/// Fixed report columns preceding the analyzer outputs.
const LEADING_COLUMNS: [&str; 2] = ["true-signal", "control-signal"];
/// Fixed report columns following the analyzer outputs.
const TRAILING_COLUMNS: [&str; 3] = ["analyzer-output", "controller-output", "controller-setpoint"];

/// Owns one source, analyzer and controller and drives them in lockstep.
pub struct ClosedLoopSimulator {
    source: Box<dyn ImageSource>,
    analyzer: Box<dyn Analyzer>,
    controller: Box<dyn Controller>,
    history: History,
    frame_shape: (usize, usize),
    /// Frames of the source's stack that passed the shape check
    accepted_frames: usize,
    steps_run: usize,
    refresh_period: Option<usize>,
}

impl ClosedLoopSimulator {
    pub fn new(
        source: Box<dyn ImageSource>,
        analyzer: Box<dyn Analyzer>,
        controller: Box<dyn Controller>,
    ) -> Self {
        let frame_shape = source.frame_shape();
        let accepted_frames = source.image_count();
        Self {
            source,
            analyzer,
            controller,
            history: History::new(),
            frame_shape,
            accepted_frames,
            steps_run: 0,
            refresh_period: None,
        }
    }

    /// Run `frames` steps, updating the controller every `refresh_period` steps.
    ///
    /// Calling this again continues the same run.
    ///
    /// # Errors
    /// `InvalidConfig` if either argument is zero (nothing is run);
    /// `FrameShape` if the source produces a frame of the wrong size, in which
    /// case the run stops and the history up to the failing step is kept.
    pub fn execute(&mut self, frames: usize, refresh_period: usize) -> SimResult<&History> {
        if frames < 1 || refresh_period < 1 {
            return Err(SimulationError::config(format!(
                "frame count and refresh period must be at least 1, got {frames} and {refresh_period}"
            )));
        }

        info!(
            "Running {} frames with {} / {} / {}, controller refresh every {} frames",
            frames,
            self.source.name(),
            self.analyzer.name(),
            self.controller.name(),
            refresh_period
        );

        for _ in 0..frames {
            if let Err(e) = self.step(refresh_period).map(|_| ()) {
                warn!(
                    "Run aborted at step {}: {e} ({} records kept)",
                    self.steps_run + 1,
                    self.history.len()
                );
                return Err(e);
            }
        }

        info!(
            "Run finished after {} steps, controller output {:.4}",
            self.steps_run,
            self.controller.current_output()
        );
        Ok(&self.history)
    }

    /// Run a single step of the loop.
    pub fn step(&mut self, refresh_period: usize) -> SimResult<&HistoryRecord> {
        if refresh_period < 1 {
            return Err(SimulationError::config("refresh period must be at least 1"));
        }
        self.refresh_period = Some(refresh_period);

        if self.steps_run == 0 {
            self.source
                .set_control_signal(self.controller.current_output());
        }

        let step = self.steps_run + 1;
        let control_signal = self.source.control_signal();

        let frame = self.source.next_image()?;
        let (expected_width, expected_height) = self.frame_shape;
        let (width, height) = frame.shape();
        if (width, height) != self.frame_shape {
            return Err(SimulationError::FrameShape {
                expected_width,
                expected_height,
                width,
                height,
            });
        }
        self.accepted_frames = self.source.image_count();

        let analyzer_output = self.analyzer.process_image(
            &frame.view(),
            self.source.object_space_pixel_size(),
            self.source.frame_duration(),
        );

        if step % refresh_period == 0 {
            let measurement = self.analyzer.batch_output();
            let output = self.controller.next_value(measurement);
            self.source.set_control_signal(output);
            debug!(
                "step {step}: measurement {measurement:.4}, setpoint {:.4}, new output {output:.4}",
                self.controller.setpoint()
            );
            self.history.push_control_sample(ControlSample {
                step,
                measurement,
                setpoint: self.controller.setpoint(),
                output,
            });
        }

        let true_signal = self
            .source
            .true_signal(self.source.image_count())
            .unwrap_or(f64::NAN);

        self.history.push_record(HistoryRecord {
            step,
            true_signal,
            control_signal,
            analyzer_output,
            controller_output: self.controller.current_output(),
            controller_setpoint: self.controller.setpoint(),
            analyzer_values: self.analyzer.output_values(),
        });
        self.steps_run = step;

        // The record was pushed just above
        Ok(&self.history.records()[self.history.len() - 1])
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn steps_run(&self) -> usize {
        self.steps_run
    }

    pub fn source(&self) -> &dyn ImageSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn ImageSource {
        self.source.as_mut()
    }

    pub fn analyzer(&self) -> &dyn Analyzer {
        self.analyzer.as_ref()
    }

    pub fn controller(&self) -> &dyn Controller {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> &mut dyn Controller {
        self.controller.as_mut()
    }

    /// Build the CSV report of the run so far.
    pub fn report(&self) -> SimResult<ReportTable> {
        let analyzer_name = self.analyzer.name().to_string();
        let analyzer_keys: Vec<String> = self
            .analyzer
            .output_values()
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        let columns = LEADING_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(analyzer_keys.iter().map(|k| format!("{analyzer_name}:{k}")))
            .chain(TRAILING_COLUMNS.iter().map(|c| c.to_string()))
            .collect();
        let mut table = ReportTable::new(columns);

        if let Some(camera) = self.source.camera_config() {
            table.add_settings("camera", &camera.parameters());
        }
        table.add_settings(self.source.name(), &self.source.parameters());
        table.add_settings(&analyzer_name, &self.analyzer.parameters());
        table.add_settings(self.controller.name(), &self.controller.parameters());
        if let Some(period) = self.refresh_period {
            table.add_settings("loop", &[("refresh-period".to_string(), period as f64)]);
        }

        for record in self.history.records() {
            let mut values = vec![record.true_signal, record.control_signal];
            values.extend(analyzer_keys.iter().map(|key| {
                record
                    .analyzer_values
                    .iter()
                    .find(|(k, _)| k == key)
                    .map_or(f64::NAN, |(_, v)| *v)
            }));
            values.extend([
                record.analyzer_output,
                record.controller_output,
                record.controller_setpoint,
            ]);
            table.push_row(record.step, values)?;
        }
        Ok(table)
    }

    /// Write the CSV report to `path`.
    pub fn save_csv(&self, path: &Path) -> SimResult<()> {
        self.report()?.save(path)
    }

    /// Frames accepted by the loop, oldest first. A frame rejected for its
    /// shape stays in the source's stack but is not part of the run.
    pub fn accepted_frames(&self) -> &[Frame] {
        let stack = self.source.stack();
        &stack[..self.accepted_frames.min(stack.len())]
    }

    /// Write every accepted frame into `dir`.
    pub fn save_stack(&self, dir: &Path) -> SimResult<Vec<PathBuf>> {
        stack::save_stack(self.accepted_frames(), dir)
    }
}

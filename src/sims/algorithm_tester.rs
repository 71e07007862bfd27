//! Offline evaluation of analyzers on a finished frame stack
//!
//! Runs every registered analyzer over the same stack, one after the other,
//! and collects the per-frame outputs into a single report with columns
//! `frame-id,<Analyzer>:<key>,...`.

use std::time::{Duration, Instant};

use log::info;

use crate::analyzers::Analyzer;
use crate::error::SimResult;
use crate::image_proc::Frame;
use crate::io::report::ReportTable;

/// Outputs of one analyzer over a stack.
#[derive(Debug, Clone)]
pub struct AnalyzerRun {
    pub name: String,
    pub parameters: Vec<(String, f64)>,
    /// Named outputs, one entry per frame
    pub outputs: Vec<Vec<(String, f64)>>,
    pub elapsed: Duration,
}

#[derive(Default)]
pub struct AlgorithmTester {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl AlgorithmTester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_analyzer(&mut self, analyzer: Box<dyn Analyzer>) {
        self.analyzers.push(analyzer);
    }

    pub fn analyzer_count(&self) -> usize {
        self.analyzers.len()
    }

    /// Run every analyzer over `frames`.
    pub fn evaluate(
        &mut self,
        frames: &[Frame],
        pixel_size: f64,
        frame_duration: f64,
    ) -> Vec<AnalyzerRun> {
        self.analyzers
            .iter_mut()
            .map(|analyzer| {
                info!("Starting analyzer {} on {} frames", analyzer.name(), frames.len());
                let start = Instant::now();
                let outputs = frames
                    .iter()
                    .map(|frame| {
                        analyzer.process_image(&frame.view(), pixel_size, frame_duration);
                        analyzer.output_values()
                    })
                    .collect();
                let elapsed = start.elapsed();
                info!("{} finished in {:?}", analyzer.name(), elapsed);

                AnalyzerRun {
                    name: analyzer.name().to_string(),
                    parameters: analyzer.parameters(),
                    outputs,
                    elapsed,
                }
            })
            .collect()
    }

    /// Run every analyzer and assemble the combined report.
    pub fn evaluate_to_report(
        &mut self,
        frames: &[Frame],
        pixel_size: f64,
        frame_duration: f64,
    ) -> SimResult<ReportTable> {
        let runs = self.evaluate(frames, pixel_size, frame_duration);
        build_report(&runs, frames.len())
    }
}

/// Combine analyzer runs over the same `frame_count` frames into one table.
pub fn build_report(runs: &[AnalyzerRun], frame_count: usize) -> SimResult<ReportTable> {
    let columns = runs
        .iter()
        .flat_map(|run| {
            run.outputs
                .first()
                .into_iter()
                .flatten()
                .map(move |(key, _)| format!("{}:{}", run.name, key))
        })
        .collect();
    let mut table = ReportTable::new(columns);

    for run in runs {
        table.add_settings(&run.name, &run.parameters);
    }

    for frame_idx in 0..frame_count {
        let values = runs
            .iter()
            .flat_map(|run| {
                run.outputs
                    .get(frame_idx)
                    .into_iter()
                    .flatten()
                    .map(|(_, value)| *value)
            })
            .collect();
        table.push_row(frame_idx + 1, values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::{SpotCounter, SpotCounterConfig, SpotMetric};
    use crate::image_proc::detection::SpotDetectorConfig;
    use ndarray::Array2;

    fn frame_with_peaks(peaks: &[(usize, usize, f64)]) -> Frame {
        let mut pixels = Array2::zeros((32, 32));
        for &(x, y, value) in peaks {
            pixels[[y, x]] = value;
        }
        Frame::new(pixels)
    }

    fn counter(box_size: usize) -> Box<dyn Analyzer> {
        Box::new(
            SpotCounter::new(SpotCounterConfig {
                detector: SpotDetectorConfig {
                    noise_tolerance: 90.0,
                    box_size,
                    ..SpotDetectorConfig::default()
                },
                metric: SpotMetric::Count,
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_report_has_one_row_per_frame_and_all_analyzers() {
        let frames = vec![
            frame_with_peaks(&[(5, 5, 500.0), (20, 5, 500.0)]),
            frame_with_peaks(&[(5, 5, 500.0), (8, 5, 400.0), (20, 20, 500.0)]),
        ];
        let mut tester = AlgorithmTester::new();
        tester.add_analyzer(counter(3));
        tester.add_analyzer(counter(9));

        let table = tester.evaluate_to_report(&frames, 0.1, 0.01).unwrap();

        assert_eq!(table.columns().len(), 8);
        assert_eq!(table.columns()[0], "SpotCounter:spot-count");
        assert_eq!(table.rows().len(), 2);
        // Box 3 separates the close pair in frame 2, box 9 merges it
        assert_eq!(table.rows()[1].1[0], 3.0);
        assert_eq!(table.rows()[1].1[4], 2.0);
        assert_eq!(table.settings().len(), 4);
    }

    #[test]
    fn test_empty_stack_gives_empty_report() {
        let mut tester = AlgorithmTester::new();
        tester.add_analyzer(counter(5));
        let table = tester.evaluate_to_report(&[], 0.1, 0.01).unwrap();
        assert!(table.rows().is_empty());
        assert!(table.columns().is_empty());
    }
}

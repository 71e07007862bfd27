//! Spot-counting analyzer built on the local-maximum spot detector

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::{Analyzer, BatchWindow};
use crate::error::SimResult;
use crate::image_proc::detection::{PreFilter, SpotDetector, SpotDetectorConfig, SpotStatistics};

/// Which per-frame statistic is handed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpotMetric {
    #[default]
    Count,
    MinDistance,
    MeanDistance,
    P10Distance,
}

impl SpotMetric {
    fn select(self, stats: &SpotStatistics) -> f64 {
        match self {
            SpotMetric::Count => stats.count as f64,
            SpotMetric::MinDistance => stats.min_distance,
            SpotMetric::MeanDistance => stats.mean_distance,
            SpotMetric::P10Distance => stats.p10_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotCounterConfig {
    pub detector: SpotDetectorConfig,
    pub metric: SpotMetric,
}

/// Counts spots per frame and reports nearest-neighbor statistics.
#[derive(Debug, Clone)]
pub struct SpotCounter {
    detector: SpotDetector,
    metric: SpotMetric,
    last: Option<SpotStatistics>,
    window: BatchWindow,
}

impl SpotCounter {
    /// Build the analyzer, validating the detector configuration.
    pub fn new(config: SpotCounterConfig) -> SimResult<Self> {
        Ok(Self {
            detector: SpotDetector::new(config.detector)?,
            metric: config.metric,
            last: None,
            window: BatchWindow::new(),
        })
    }

    pub fn metric(&self) -> SpotMetric {
        self.metric
    }

    /// Statistics of the most recent frame.
    pub fn last_statistics(&self) -> Option<&SpotStatistics> {
        self.last.as_ref()
    }
}

impl Analyzer for SpotCounter {
    fn name(&self) -> &str {
        "SpotCounter"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        let mut params = vec![
            ("noise-tolerance".to_string(), self.detector.noise_tolerance()),
            ("box-size".to_string(), self.detector.box_size() as f64),
        ];
        if let PreFilter::Gaussian { sigma } = self.detector.config().prefilter {
            params.push(("prefilter-sigma".to_string(), sigma));
        }
        params
    }

    fn process_image(
        &mut self,
        pixels: &ArrayView2<f64>,
        _pixel_size: f64,
        _frame_duration: f64,
    ) -> f64 {
        let stats = self.detector.analyze(pixels);
        let value = self.metric.select(&stats);
        self.window.push(value);
        self.last = Some(stats);
        value
    }

    fn intermittent_output(&self) -> f64 {
        self.last
            .as_ref()
            .map_or(f64::NAN, |stats| self.metric.select(stats))
    }

    fn batch_output(&mut self) -> f64 {
        let fallback = self.intermittent_output();
        self.window.take_mean(fallback)
    }

    fn output_values(&self) -> Vec<(String, f64)> {
        match &self.last {
            Some(stats) => stats.output_values(),
            None => SpotStatistics::from_regions(&[])
                .output_values()
                .into_iter()
                .map(|(key, _)| (key, f64::NAN))
                .collect(),
        }
    }
}

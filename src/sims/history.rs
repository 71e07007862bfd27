//! Append-only run history

/// Everything recorded for one step of a closed-loop run.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    /// 1-based step index
    pub step: usize,
    /// Ground truth behind the frame (NaN if the source does not know it)
    pub true_signal: f64,
    /// Control signal the frame was generated with
    pub control_signal: f64,
    /// Analyzer's single-frame reduction
    pub analyzer_output: f64,
    /// Controller output in effect after this step
    pub controller_output: f64,
    pub controller_setpoint: f64,
    /// Named per-frame analyzer outputs, in column order
    pub analyzer_values: Vec<(String, f64)>,
}

/// One controller refresh event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSample {
    /// Step at whose end the controller ran
    pub step: usize,
    /// Batch measurement handed to the controller
    pub measurement: f64,
    pub setpoint: f64,
    /// New output pushed to the source
    pub output: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    records: Vec<HistoryRecord>,
    control_samples: Vec<ControlSample>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_record(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    pub fn push_control_sample(&mut self, sample: ControlSample) {
        self.control_samples.push(sample);
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    pub fn control_samples(&self) -> &[ControlSample] {
        &self.control_samples
    }

    /// Record of step `step` (1-based).
    pub fn record(&self, step: usize) -> Option<&HistoryRecord> {
        step.checked_sub(1).and_then(|idx| self.records.get(idx))
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn true_signals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.true_signal).collect()
    }

    pub fn control_signals(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.control_signal).collect()
    }

    pub fn analyzer_outputs(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.analyzer_output).collect()
    }

    pub fn controller_outputs(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.controller_output).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step: usize) -> HistoryRecord {
        HistoryRecord {
            step,
            true_signal: step as f64,
            control_signal: 0.0,
            analyzer_output: 1.0,
            controller_output: 0.5,
            controller_setpoint: 2.0,
            analyzer_values: Vec::new(),
        }
    }

    #[test]
    fn test_records_are_one_based() {
        let mut history = History::new();
        history.push_record(record(1));
        history.push_record(record(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.record(0), None);
        assert_eq!(history.record(2).map(|r| r.step), Some(2));
        assert_eq!(history.true_signals(), vec![1.0, 2.0]);
    }
}

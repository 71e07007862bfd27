//! CSV run reports
//!
//! Layout of a report file:
//!
//! ```text
//! camera.width:64,camera.height:64,SpotCounter.noise-tolerance:90,...
//! frame-id,true-signal,control-signal,SpotCounter:spot-count,...
//! 1,2.000000,0.500000,2.000000,...
//! ```
//!
//! Line 1 holds the settings of every component, line 2 the column names and
//! every following line one frame. Missing or degenerate values print as `NaN`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;

use crate::error::{SimResult, SimulationError};

/// In-memory report: settings, column names and one row per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    settings: Vec<(String, f64)>,
    columns: Vec<String>,
    rows: Vec<(usize, Vec<f64>)>,
}

impl ReportTable {
    /// Empty table; `columns` lists every column after `frame-id`.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            settings: Vec::new(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Record the settings of one component as `component.key`.
    pub fn add_settings(&mut self, component: &str, parameters: &[(String, f64)]) {
        self.settings.extend(
            parameters
                .iter()
                .map(|(key, value)| (format!("{component}.{key}"), *value)),
        );
    }

    /// Append one frame's values in column order.
    pub fn push_row(&mut self, frame_id: usize, values: Vec<f64>) -> SimResult<()> {
        if values.len() != self.columns.len() {
            return Err(SimulationError::ReportRow {
                frame_id,
                values: values.len(),
                columns: self.columns.len(),
            });
        }
        self.rows.push((frame_id, values));
        Ok(())
    }

    pub fn settings(&self) -> &[(String, f64)] {
        &self.settings
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[(usize, Vec<f64>)] {
        &self.rows
    }

    /// Values of one named column, in row order.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|(_, values)| values[idx]).collect())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let settings: Vec<String> = self
            .settings
            .iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect();
        writeln!(writer, "{}", settings.join(","))?;

        write!(writer, "frame-id")?;
        for column in &self.columns {
            write!(writer, ",{column}")?;
        }
        writeln!(writer)?;

        for (frame_id, values) in &self.rows {
            write!(writer, "{frame_id}")?;
            for value in values {
                write!(writer, ",{value:.6}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Render the whole report as a string.
    pub fn to_csv_string(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Write the report to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> SimResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!("Wrote {} report rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

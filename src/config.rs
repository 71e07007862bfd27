//! JSON description of a whole closed-loop simulation
//!
//! Every section is optional in the file; missing fields take the defaults
//! of the corresponding configuration struct.
//!
//! ```json
//! {
//!   "camera": { "width_px": 64, "height_px": 64 },
//!   "fluorophores": { "count": 500, "seed": 7 },
//!   "analyzer": { "detector": { "noise_tolerance": 90.0, "box_size": 5 } },
//!   "controller": { "kind": "pid", "kp": 0.02, "ki": 0.005, "setpoint": 10.0 },
//!   "run": { "frames": 1000, "refresh_period": 10 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::analyzers::{SpotCounter, SpotCounterConfig};
use crate::controllers::ControllerConfig;
use crate::error::{SimResult, SimulationError};
use crate::hardware::{CameraConfig, CameraModel};
use crate::sims::ClosedLoopSimulator;
use crate::source::{FluorophoreConfig, FluorophoreSource};

/// Length of a run and where its results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of frames to simulate
    pub frames: usize,
    /// Controller update period in frames
    pub refresh_period: usize,
    /// CSV report destination
    pub csv_path: Option<PathBuf>,
    /// Directory for the frame stack
    pub stack_dir: Option<PathBuf>,
    /// JSON snapshot of the source at the end of the run
    pub state_path: Option<PathBuf>,
    /// JSON log of the source's state changes
    pub messages_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 1000,
            refresh_period: 10,
            csv_path: None,
            stack_dir: None,
            state_path: None,
            messages_path: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.frames < 1 || self.refresh_period < 1 {
            return Err(SimulationError::config(format!(
                "run.frames and run.refresh_period must be at least 1, got {} and {}",
                self.frames, self.refresh_period
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub camera: CameraConfig,
    pub fluorophores: FluorophoreConfig,
    pub analyzer: SpotCounterConfig,
    pub controller: ControllerConfig,
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Read a configuration from a JSON file.
    pub fn load(path: &Path) -> SimResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("Loaded simulation config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> SimResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> SimResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate every section without building anything.
    pub fn validate(&self) -> SimResult<()> {
        self.camera.validate()?;
        self.fluorophores.validate()?;
        self.run.validate()?;
        Ok(())
    }

    /// Build a ready-to-run fluorophore simulation.
    ///
    /// All parameters are validated here, before any frame is produced.
    pub fn build(&self) -> SimResult<ClosedLoopSimulator> {
        self.run.validate()?;
        let camera = CameraModel::new(self.camera.clone())?;
        let source = FluorophoreSource::new(camera, self.fluorophores.clone())?;
        let analyzer = SpotCounter::new(self.analyzer.clone())?;
        let controller = self.controller.build()?;
        Ok(ClosedLoopSimulator::new(
            Box::new(source),
            Box::new(analyzer),
            controller,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimulationConfig::from_json(
            r#"{"camera": {"width_px": 32}, "run": {"frames": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.camera.width_px, 32);
        assert_eq!(config.camera.height_px, CameraConfig::default().height_px);
        assert_eq!(config.run.frames, 5);
        assert_eq!(config.run.refresh_period, 10);
        assert_eq!(config.controller, ControllerConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sim.json");
        let config = SimulationConfig {
            run: RunConfig {
                frames: 12,
                refresh_period: 3,
                csv_path: Some(PathBuf::from("out.csv")),
                ..RunConfig::default()
            },
            ..SimulationConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SimulationConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_setpoint_override_survives_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sim.json");
        let mut config = SimulationConfig::default();
        config.controller.set_setpoint(25.0);
        config.save(&path).unwrap();

        let loaded = SimulationConfig::load(&path).unwrap();
        assert_eq!(loaded.controller.setpoint(), 25.0);
        assert_eq!(loaded.build().unwrap().controller().setpoint(), 25.0);
    }

    #[test]
    fn test_build_rejects_bad_sections() {
        let bad_run = SimulationConfig {
            run: RunConfig {
                refresh_period: 0,
                ..RunConfig::default()
            },
            ..SimulationConfig::default()
        };
        assert!(bad_run.build().is_err());

        let bad_detector = SimulationConfig::from_json(
            r#"{"analyzer": {"detector": {"box_size": 6}}}"#,
        )
        .unwrap();
        assert!(matches!(
            bad_detector.build(),
            Err(SimulationError::InvalidConfig(_))
        ));

        let bad_controller = SimulationConfig::from_json(
            r#"{"controller": {"kind": "pid", "kp": 1.0, "bounds": {"min": 2.0, "max": 1.0}}}"#,
        )
        .unwrap();
        assert!(bad_controller.build().is_err());
    }

    #[test]
    fn test_malformed_json_is_reported() {
        assert!(matches!(
            SimulationConfig::from_json("{not json"),
            Err(SimulationError::Json(_))
        ));
    }

    #[test]
    fn test_default_config_builds_and_runs() {
        let config = SimulationConfig {
            camera: CameraConfig {
                width_px: 32,
                height_px: 32,
                ..CameraConfig::default()
            },
            ..SimulationConfig::default()
        };
        let mut sim = config.build().unwrap();
        sim.execute(4, 2).unwrap();
        assert_eq!(sim.history().len(), 4);
    }
}

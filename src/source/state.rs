//! Serializable snapshots of a source and its log of state-change messages
//!
//! A [`SourceState`] describes the source *now*; [`SourceMessage`]s describe
//! what changed since the messages were last taken. Both are written as
//! pretty-printed JSON.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::fluorophores::EmitterState;
use crate::error::SimResult;
use crate::hardware::CameraConfig;

/// Number of emitters in each photophysical state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitterCounts {
    pub off: usize,
    pub on: usize,
    pub bleached: usize,
}

impl EmitterCounts {
    pub fn total(&self) -> usize {
        self.off + self.on + self.bleached
    }
}

/// Current state of an image source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    pub source: String,
    pub time_step: usize,
    pub image_count: usize,
    pub control_signal: f64,
    /// Field of view in square micrometers (object space)
    pub fov_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emitters: Option<EmitterCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraConfig>,
}

impl SourceState {
    pub fn to_json(&self) -> SimResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn save(&self, path: &Path) -> SimResult<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Wrote {} state to {}", self.source, path.display());
        Ok(())
    }
}

/// A change in the simulation that happened during one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceMessage {
    /// An emitter switched photophysical state
    EmitterTransition {
        time_step: usize,
        emitter: usize,
        from: EmitterState,
        to: EmitterState,
    },
    /// The control signal was changed
    ControlSignal { time_step: usize, value: f64 },
}

/// JSON array of `messages`.
pub fn messages_to_json(messages: &[SourceMessage]) -> SimResult<serde_json::Value> {
    Ok(serde_json::to_value(messages)?)
}

/// Write `messages` to `path` as a JSON array.
pub fn save_messages(messages: &[SourceMessage], path: &Path) -> SimResult<()> {
    fs::write(path, serde_json::to_string_pretty(messages)?)?;
    info!("Wrote {} messages to {}", messages.len(), path.display());
    Ok(())
}

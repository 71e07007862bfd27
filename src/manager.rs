//! Caller-owned registry of closed-loop simulators

use std::collections::BTreeMap;

use log::info;

use crate::error::{SimResult, SimulationError};
use crate::hardware::CameraConfig;
use crate::sims::ClosedLoopSimulator;

/// Holds any number of simulators under numeric ids and remembers the camera
/// of the most recently added one.
#[derive(Default)]
pub struct SimulationContext {
    simulators: BTreeMap<usize, ClosedLoopSimulator>,
    next_id: usize,
    most_recent_camera: Option<CameraConfig>,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a simulator and return its id. Ids are never reused.
    pub fn add_simulator(&mut self, simulator: ClosedLoopSimulator) -> usize {
        let id = self.next_id;
        self.next_id += 1;

        if let Some(camera) = simulator.source().camera_config() {
            self.most_recent_camera = Some(camera.clone());
        }
        info!("Registered simulator {id} ({})", simulator.source().name());
        self.simulators.insert(id, simulator);
        id
    }

    /// Ids of all registered simulators, ascending.
    pub fn ids(&self) -> Vec<usize> {
        self.simulators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.simulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulators.is_empty()
    }

    pub fn simulator(&self, id: usize) -> SimResult<&ClosedLoopSimulator> {
        self.simulators
            .get(&id)
            .ok_or(SimulationError::UnknownSimulator(id))
    }

    pub fn simulator_mut(&mut self, id: usize) -> SimResult<&mut ClosedLoopSimulator> {
        self.simulators
            .get_mut(&id)
            .ok_or(SimulationError::UnknownSimulator(id))
    }

    /// Unregister a simulator and hand it back to the caller.
    pub fn remove_simulator(&mut self, id: usize) -> SimResult<ClosedLoopSimulator> {
        self.simulators
            .remove(&id)
            .ok_or(SimulationError::UnknownSimulator(id))
    }

    /// Camera of the most recently added simulator that models one.
    pub fn most_recent_camera(&self) -> Option<&CameraConfig> {
        self.most_recent_camera.as_ref()
    }
}

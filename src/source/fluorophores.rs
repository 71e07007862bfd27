//! Blinking fluorophore population imaged through the camera model
//!
//! Every emitter is a three-state Markov chain advanced once per frame:
//!
//! ```text
//!            p_act(laser)          p_bleach
//!   Off ─────────────────▶ On ─────────────▶ Bleached
//!    ▲                     │
//!    └──────── p_off ──────┘
//! ```
//!
//! with `p = 1 − exp(−rate)` for each transition and the activation rate
//! scaled by the control signal (activation laser power). Emitters that are
//! on during a frame contribute `signal_photons` through the pixel-space PSF;
//! obstructions and a uniform background are added before the sensor noise
//! pipeline turns expected photons into counts.

use log::debug;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::obstructors::{GoldBead, GoldBeadConfig, Obstructor};
use super::state::{EmitterCounts, SourceMessage};
use super::ImageSource;
use crate::error::{SimResult, SimulationError};
use crate::hardware::{CameraConfig, CameraModel};
use crate::image_proc::noise::apply_sensor_noise;
use crate::image_proc::render::{render_emissions, PointEmission};
use crate::image_proc::Frame;

/// Fluorophore population and photophysics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluorophoreConfig {
    /// Number of emitters scattered uniformly over the field
    pub count: usize,
    /// Expected photons collected from one emitter during one frame
    pub signal_photons: f64,
    /// Expected background photons per pixel per frame
    pub background_photons: f64,
    /// Off → on rate per frame at unit control signal
    pub activation_rate: f64,
    /// On → off rate per frame
    pub off_rate: f64,
    /// On → bleached rate per frame
    pub bleach_rate: f64,
    /// Seed for positions, kinetics and sensor noise
    pub seed: u64,
    /// Fiducials drawn into every frame
    pub gold_beads: Vec<GoldBeadConfig>,
}

impl Default for FluorophoreConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            signal_photons: 2500.0,
            background_photons: 10.0,
            activation_rate: 0.005,
            off_rate: 0.6,
            bleach_rate: 0.02,
            seed: 42,
            gold_beads: Vec::new(),
        }
    }
}

impl FluorophoreConfig {
    pub fn validate(&self) -> SimResult<()> {
        let rates = [
            ("signal_photons", self.signal_photons),
            ("background_photons", self.background_photons),
            ("activation_rate", self.activation_rate),
            ("off_rate", self.off_rate),
            ("bleach_rate", self.bleach_rate),
        ];
        for (name, value) in rates {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimulationError::config(format!(
                    "fluorophores.{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn parameters(&self) -> Vec<(String, f64)> {
        vec![
            ("count".to_string(), self.count as f64),
            ("signal-photons".to_string(), self.signal_photons),
            ("background-photons".to_string(), self.background_photons),
            ("activation-rate".to_string(), self.activation_rate),
            ("off-rate".to_string(), self.off_rate),
            ("bleach-rate".to_string(), self.bleach_rate),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitterState {
    Off,
    On,
    Bleached,
}

#[derive(Debug, Clone, Copy)]
struct Emitter {
    x: f64,
    y: f64,
    state: EmitterState,
}

fn transition_probability(rate: f64) -> f64 {
    1.0 - (-rate.max(0.0)).exp()
}

/// Microscope simulation of a photo-switchable fluorophore sample.
pub struct FluorophoreSource {
    camera: CameraModel,
    config: FluorophoreConfig,
    emitters: Vec<Emitter>,
    obstructors: Vec<Box<dyn Obstructor>>,
    rng: StdRng,
    control_signal: f64,
    stack: Vec<Frame>,
    /// Emitters on during each generated frame
    true_signals: Vec<f64>,
    time_step: usize,
    /// State changes since the log was last taken
    messages: Vec<SourceMessage>,
}

impl FluorophoreSource {
    /// Scatter the population over the field; all emitters start off.
    pub fn new(camera: CameraModel, config: FluorophoreConfig) -> SimResult<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let (width, height) = camera.frame_shape();
        let emitters = (0..config.count)
            .map(|_| Emitter {
                x: rng.gen_range(0.0..width as f64),
                y: rng.gen_range(0.0..height as f64),
                state: EmitterState::Off,
            })
            .collect();

        let obstructors = config
            .gold_beads
            .iter()
            .map(|bead| {
                GoldBead::new(*bead, &camera).map(|b| Box::new(b) as Box<dyn Obstructor>)
            })
            .collect::<SimResult<Vec<_>>>()?;

        Ok(Self {
            camera,
            config,
            emitters,
            obstructors,
            rng,
            control_signal: 0.0,
            stack: Vec::new(),
            true_signals: Vec::new(),
            time_step: 0,
            messages: Vec::new(),
        })
    }

    /// Add an obstruction drawn into all subsequent frames.
    pub fn add_obstructor(&mut self, obstructor: Box<dyn Obstructor>) {
        self.obstructors.push(obstructor);
    }

    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    pub fn config(&self) -> &FluorophoreConfig {
        &self.config
    }

    /// Number of emitters currently in `state`.
    pub fn count_in_state(&self, state: EmitterState) -> usize {
        self.emitters.iter().filter(|e| e.state == state).count()
    }

    fn advance_kinetics(&mut self) {
        let laser = self.control_signal.max(0.0);
        let p_act = transition_probability(self.config.activation_rate * laser);
        let p_off = transition_probability(self.config.off_rate);
        let p_bleach = transition_probability(self.config.bleach_rate);

        let step = self.time_step + 1;
        let rng = &mut self.rng;
        for (idx, emitter) in self.emitters.iter_mut().enumerate() {
            let next = match emitter.state {
                EmitterState::Off => {
                    if rng.gen::<f64>() < p_act {
                        EmitterState::On
                    } else {
                        EmitterState::Off
                    }
                }
                EmitterState::On => {
                    if rng.gen::<f64>() < p_bleach {
                        EmitterState::Bleached
                    } else if rng.gen::<f64>() < p_off {
                        EmitterState::Off
                    } else {
                        EmitterState::On
                    }
                }
                EmitterState::Bleached => EmitterState::Bleached,
            };
            if next != emitter.state {
                self.messages.push(SourceMessage::EmitterTransition {
                    time_step: step,
                    emitter: idx,
                    from: emitter.state,
                    to: next,
                });
                emitter.state = next;
            }
        }
        self.time_step = step;
    }
}

impl ImageSource for FluorophoreSource {
    fn name(&self) -> &str {
        "FluorophoreSource"
    }

    fn parameters(&self) -> Vec<(String, f64)> {
        let mut params = self.config.parameters();
        params.push(("gold-beads".to_string(), self.obstructors.len() as f64));
        params
    }

    fn frame_shape(&self) -> (usize, usize) {
        self.camera.frame_shape()
    }

    fn next_image(&mut self) -> SimResult<Frame> {
        // Emitters switch at the frame boundary; the new state holds for the exposure
        self.advance_kinetics();

        let emissions: Vec<PointEmission> = self
            .emitters
            .iter()
            .filter(|e| e.state == EmitterState::On)
            .map(|e| PointEmission {
                x: e.x,
                y: e.y,
                photons: self.config.signal_photons,
            })
            .collect();

        let mut expected: Array2<f64> = render_emissions(
            self.camera.frame_shape(),
            self.config.background_photons,
            &self.camera.psf_digital().view(),
            &emissions,
        );
        for obstructor in &self.obstructors {
            obstructor.apply_to(&mut expected);
        }

        let counts = apply_sensor_noise(&expected.view(), &self.camera, &mut self.rng);
        let frame = Frame::new(counts);

        debug!(
            "frame {}: {} emitters on, laser {:.4}",
            self.stack.len() + 1,
            emissions.len(),
            self.control_signal
        );

        self.true_signals.push(emissions.len() as f64);
        self.stack.push(frame.clone());
        Ok(frame)
    }

    fn set_control_signal(&mut self, value: f64) {
        if value != self.control_signal {
            self.messages.push(SourceMessage::ControlSignal {
                time_step: self.time_step,
                value,
            });
        }
        self.control_signal = value;
    }

    fn control_signal(&self) -> f64 {
        self.control_signal
    }

    fn true_signal(&self, image_no: usize) -> Option<f64> {
        image_no
            .checked_sub(1)
            .and_then(|idx| self.true_signals.get(idx).copied())
    }

    fn short_true_signal_description(&self) -> &str {
        "emitters-on"
    }

    fn object_space_pixel_size(&self) -> f64 {
        self.camera.config().object_space_pixel_size()
    }

    fn frame_duration(&self) -> f64 {
        self.camera.config().frame_duration_s()
    }

    fn image_count(&self) -> usize {
        self.stack.len()
    }

    fn increment_time_step(&mut self) {
        self.advance_kinetics();
    }

    fn stack(&self) -> &[Frame] {
        &self.stack
    }

    fn camera_config(&self) -> Option<&CameraConfig> {
        Some(self.camera.config())
    }

    fn time_step(&self) -> usize {
        self.time_step
    }

    fn emitter_counts(&self) -> Option<EmitterCounts> {
        Some(EmitterCounts {
            off: self.count_in_state(EmitterState::Off),
            on: self.count_in_state(EmitterState::On),
            bleached: self.count_in_state(EmitterState::Bleached),
        })
    }

    fn messages(&self) -> &[SourceMessage] {
        &self.messages
    }

    fn take_messages(&mut self) -> Vec<SourceMessage> {
        std::mem::take(&mut self.messages)
    }
}

//! Closed-loop SMLM simulation driver
//!
//! Runs a fluorophore simulation whose activation laser is driven by a
//! feedback controller acting on the spot count of every frame.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 1000 frames, PID controller, refresh every 10 frames
//! cargo run --release --bin closed_loop -- --csv run.csv
//!
//! # From a JSON config, with overrides and the frame stack saved
//! cargo run --release --bin closed_loop -- --config sim.json \
//!     --frames 500 --setpoint 25 --stack-dir frames/
//!
//! # Save the final source state and the emitter transition log
//! cargo run --release --bin closed_loop -- --state state.json --messages messages.json
//!
//! # Write the effective configuration (overrides included) and exit
//! cargo run --release --bin closed_loop -- --dump-config sim.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use smlm_loop::config::SimulationConfig;
use smlm_loop::source::ImageSource;

#[derive(Parser, Debug)]
#[command(author, version, about = "Closed-loop SMLM acquisition simulator")]
struct Args {
    /// JSON simulation config (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long)]
    frames: Option<usize>,

    /// Controller update period in frames
    #[arg(short, long)]
    refresh_period: Option<usize>,

    /// Controller setpoint (spots per frame for the default analyzer)
    #[arg(short, long)]
    setpoint: Option<f64>,

    /// Seed for emitter positions, kinetics and sensor noise
    #[arg(long)]
    seed: Option<u64>,

    /// CSV report destination
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Directory for the generated frame stack
    #[arg(long)]
    stack_dir: Option<PathBuf>,

    /// JSON snapshot of the source at the end of the run
    #[arg(long)]
    state: Option<PathBuf>,

    /// JSON log of emitter transitions and control changes
    #[arg(long)]
    messages: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(frames) = args.frames {
        config.run.frames = frames;
    }
    if let Some(period) = args.refresh_period {
        config.run.refresh_period = period;
    }
    if let Some(seed) = args.seed {
        config.fluorophores.seed = seed;
    }
    if let Some(path) = args.csv {
        config.run.csv_path = Some(path);
    }
    if let Some(dir) = args.stack_dir {
        config.run.stack_dir = Some(dir);
    }
    if let Some(path) = args.state {
        config.run.state_path = Some(path);
    }
    if let Some(path) = args.messages {
        config.run.messages_path = Some(path);
    }
    if let Some(setpoint) = args.setpoint {
        config.controller.set_setpoint(setpoint);
    }

    if let Some(path) = &args.dump_config {
        config
            .save(path)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        info!("Wrote effective config to {}", path.display());
        return Ok(());
    }

    let mut simulator = config.build().context("Invalid simulation config")?;

    let run_result = simulator
        .execute(config.run.frames, config.run.refresh_period)
        .map(|_| ());

    // Whatever was recorded is persisted, even after an aborted run
    if let Some(path) = &config.run.csv_path {
        simulator
            .save_csv(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }
    if let Some(dir) = &config.run.stack_dir {
        simulator
            .save_stack(dir)
            .with_context(|| format!("Failed to write frames to {}", dir.display()))?;
    }
    if let Some(path) = &config.run.state_path {
        simulator
            .source()
            .save_state(path)
            .with_context(|| format!("Failed to write state {}", path.display()))?;
    }
    if let Some(path) = &config.run.messages_path {
        simulator
            .source()
            .save_messages(path)
            .with_context(|| format!("Failed to write messages {}", path.display()))?;
    }

    run_result.context("Simulation aborted")?;

    let history = simulator.history();
    let settled: Vec<f64> = history
        .analyzer_outputs()
        .into_iter()
        .rev()
        .take(config.run.refresh_period * 10)
        .filter(|v| v.is_finite())
        .collect();
    let mean_tail = if settled.is_empty() {
        f64::NAN
    } else {
        settled.iter().sum::<f64>() / settled.len() as f64
    };

    println!("Frames simulated:     {}", history.len());
    println!("Controller updates:   {}", history.control_samples().len());
    println!("Setpoint:             {:.3}", simulator.controller().setpoint());
    println!("Final laser power:    {:.4}", simulator.controller().current_output());
    if let Some(counts) = simulator.source().emitter_counts() {
        println!(
            "Emitters off/on/bleached: {}/{}/{}",
            counts.off, counts.on, counts.bleached
        );
    }
    println!("Mean analyzer output: {mean_tail:.3} (last {} frames)", settled.len());

    Ok(())
}

//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use uniaxial::{
    Axis, DisplayPeer, ExecutionError, LoadModes, LoadTestConfig, LoadTestResult, Scalar,
    SteppingEngine,
};

/// Tension failure script: the 5th sample sits exactly on the threshold and
/// the 6th drops below it.
pub const TENSION_SCRIPT: [f64; 6] = [1.0, 2.0, 3.0, 2.0, 1.5, 0.4];

/// Compression failure script: fails on the 5th sample (`-3 / -8`).
pub const COMPRESSION_SCRIPT: [f64; 5] = [-1.0, -4.0, -8.0, -6.0, -3.0];

/// Restorable part of the scripted engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScriptState {
    pub iteration: u64,
    pub time: f64,
    pub strain: f64,
    pub strain_rate: f64,
}

/// Stepping engine that replays a stress script per loading direction.
///
/// Each step advances time by 1.0 and strain by the strain rate. Stress is
/// `script[iteration - 1]`, clamped to the last entry, using the tension
/// script while the rate is positive and the compression script otherwise.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    pub state: ScriptState,
    pub tension: Vec<f64>,
    pub compression: Vec<f64>,
    pub restores: usize,
    pub step_delay: Option<Duration>,
    pub fail_at: Option<u64>,
}

impl ScriptedEngine {
    pub fn new(tension: &[f64], compression: &[f64]) -> Self {
        Self {
            state: ScriptState::default(),
            tension: tension.to_vec(),
            compression: compression.to_vec(),
            restores: 0,
            step_delay: None,
            fail_at: None,
        }
    }

    /// Engine that never fails: stress stays at 1.0 forever.
    pub fn flat() -> Self {
        Self::new(&[1.0], &[-1.0])
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    pub fn failing_at(mut self, iteration: u64) -> Self {
        self.fail_at = Some(iteration);
        self
    }

    fn stress(&self) -> f64 {
        if self.state.iteration == 0 {
            return 0.0;
        }
        let script = if self.state.strain_rate > 0.0 {
            &self.tension
        } else {
            &self.compression
        };
        let idx = usize::try_from(self.state.iteration - 1).unwrap_or(usize::MAX);
        script
            .get(idx)
            .or_else(|| script.last())
            .copied()
            .unwrap_or(0.0)
    }
}

impl SteppingEngine for ScriptedEngine {
    type State = ScriptState;

    fn step(&mut self) -> LoadTestResult<()> {
        if let Some(delay) = self.step_delay {
            thread::sleep(delay);
        }
        let next = self.state.iteration + 1;
        if self.fail_at == Some(next) {
            return Err(ExecutionError::Engine {
                message: format!("scripted failure at iteration {next}"),
            }
            .into());
        }
        self.state.iteration = next;
        self.state.time += 1.0;
        self.state.strain += self.state.strain_rate;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.state.time
    }

    fn iteration(&self) -> u64 {
        self.state.iteration
    }

    fn read_scalar(&self, scalar: Scalar) -> f64 {
        match scalar {
            Scalar::Strain => self.state.strain,
            Scalar::AverageStress => self.stress(),
        }
    }

    fn loading_axis(&self) -> Axis {
        Axis::Z
    }

    fn extent(&self, _axis: Axis) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn section_area(&self, _position: f64, _axis: Axis) -> f64 {
        1.0
    }

    fn section_force(&self, _position: f64, _axis: Axis) -> f64 {
        self.stress()
    }

    fn set_strain_rate(&mut self, rate: f64) {
        self.state.strain_rate = rate;
    }

    fn capture(&self) -> Self::State {
        self.state
    }

    fn restore(&mut self, state: &Self::State) {
        self.state = *state;
        self.restores += 1;
    }
}

/// Display peer recording every scale it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    pub scales: Arc<Mutex<Vec<f64>>>,
}

impl DisplayPeer for RecordingDisplay {
    fn set_displacement_scale(&mut self, scale: f64) {
        self.scales.lock().unwrap().push(scale);
    }
}

/// Config that samples every step and evaluates the monitor every step.
pub fn scripted_config(modes: LoadModes, output_dir: &Path) -> LoadTestConfig {
    LoadTestConfig {
        run_id: "scripted".to_string(),
        modes,
        strain_rate_tension: 1.0,
        strain_rate_compression: 1.0,
        sample_strain_interval: 1.0,
        sample_real_limit_ms: 0,
        monitor_period_ms: 0,
        max_samples: 64,
        pause_timeout_ms: 5_000,
        output_dir: output_dir.to_path_buf(),
        ..LoadTestConfig::default()
    }
}

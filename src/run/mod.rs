//! Run-parameter derivation and run control.
//!
//! Derives solver run parameters (timestep, step count, exhaust flow) from a
//! sweep point's physical inputs, then drives one blocking engine run:
//! apply boundary and motion values, step to the stopping target, export the
//! configured monitor series, and persist a checkpoint. The checkpoint is
//! saved after every run, unconditionally.
//!
//! Timestep and step count come from the angular resolution of the rotating
//! mesh: a run advances `step_deg` of propeller rotation per timestep, so
//!
//! ```text
//! dt    = step_deg / (rpm/60 · 360)          [s]
//! steps = round(revolutions · 360 / step_deg)
//! ```
//!
//! The first rotation rate of each ladder gets a larger warm-up revolution
//! count; later rates start from the previous converged field and settle in
//! fewer revolutions.

use std::path::PathBuf;

use tracing::debug;

use crate::engine::{EngineError, EnginePort};

/// Timestep (s) that advances `step_deg` degrees of rotation per step at
/// the given rotation rate.
pub fn timestep_s(rpm: f64, step_deg: f64) -> f64 {
    debug_assert!(rpm > 0.0, "rotation rate must be positive, got {}", rpm);
    debug_assert!(step_deg > 0.0, "angular step must be positive");
    step_deg / (rpm / 60.0 * 360.0)
}

/// Number of timesteps spanning exactly one revolution.
pub fn revolution_steps(step_deg: f64) -> usize {
    debug_assert!(step_deg > 0.0, "angular step must be positive");
    (360.0 / step_deg).round() as usize
}

/// Number of timesteps spanning `revolutions` full revolutions.
pub fn step_count(revolutions: f64, step_deg: f64) -> usize {
    debug_assert!(step_deg > 0.0, "angular step must be positive");
    (revolutions * 360.0 / step_deg).round() as usize
}

/// Exhaust mass flow rate (kg/s) at part throttle, scaled cubically from
/// the rated operating point: `(rpm / rated_rpm)³ · rated_flow`.
pub fn exhaust_flow_kgps(rpm: f64, rated_rpm: f64, rated_flow_kgps: f64) -> f64 {
    debug_assert!(rated_rpm > 0.0, "rated rpm must be positive");
    (rpm / rated_rpm).powi(3) * rated_flow_kgps
}

/// How a run stops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StoppingRule {
    /// Advance a fixed number of solver iterations.
    FixedSteps(usize),
    /// Run until the engine's maximum-physical-time criterion reaches the
    /// given target (s).
    MaxTime(f64),
}

/// Ramping max-time target: each point along the ladder runs a fixed
/// increment longer than the one before it, so every point accumulates the
/// same amount of additional settled time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StoppingRamp {
    target_s: f64,
    increment_s: f64,
}

impl StoppingRamp {
    /// Create a ramp starting at `start_s` and growing by `increment_s`
    /// per point.
    pub fn new(start_s: f64, increment_s: f64) -> Self {
        Self {
            target_s: start_s,
            increment_s,
        }
    }

    /// Take the next target, advancing the ramp.
    pub fn next_target(&mut self) -> f64 {
        let target = self.target_s;
        self.target_s += self.increment_s;
        target
    }
}

/// One monitor plot to export as a delimited series after the run.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesExport {
    /// Engine plot name.
    pub plot: String,
    /// File suffix; the export lands at `<dir>/<title>_<suffix>.csv`.
    pub suffix: String,
}

impl SeriesExport {
    /// Create an export binding.
    pub fn new(plot: &str, suffix: &str) -> Self {
        Self {
            plot: plot.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// Names of the engine objects a run touches.
#[derive(Clone, Debug)]
pub struct EngineNames {
    /// Inlet boundary carrying the tow velocity.
    pub inlet_boundary: String,
    /// Scalar variable set on the inlet boundary.
    pub inlet_variable: String,
    /// Exhaust inlet boundary.
    pub exhaust_boundary: String,
    /// Scalar variable set on the exhaust boundary.
    pub exhaust_variable: String,
    /// Rotating motion for the propeller.
    pub rotation_motion: String,
    /// Maximum-physical-time stopping criterion.
    pub max_time_criterion: String,
}

impl Default for EngineNames {
    fn default() -> Self {
        Self {
            inlet_boundary: "inlet".to_string(),
            inlet_variable: "Velocity Magnitude".to_string(),
            exhaust_boundary: "Inlet_Exhaust".to_string(),
            exhaust_variable: "Mass Flow Rate".to_string(),
            rotation_motion: "Rotation".to_string(),
            max_time_criterion: "Maximum Physical Time".to_string(),
        }
    }
}

/// Derived run parameters for one sweep point. Fields left `None` are not
/// touched in the session, so a steady attitude run carries no timestep and
/// no rotation rate.
#[derive(Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Solver timestep (s).
    pub timestep_s: Option<f64>,
    /// Stopping target.
    pub stopping: StoppingRule,
    /// Inlet tow velocity.
    pub inlet_velocity: Option<f64>,
    /// Exhaust mass flow rate (kg/s).
    pub exhaust_flow_kgps: Option<f64>,
    /// Propeller rotation rate (rpm).
    pub rotation_rpm: Option<f64>,
}

/// Drives one engine run per sweep point.
#[derive(Clone, Debug)]
pub struct RunController {
    /// Engine object names.
    pub names: EngineNames,
    /// Monitor plots exported after each run.
    pub exports: Vec<SeriesExport>,
    /// Directory receiving series exports.
    pub output_dir: PathBuf,
}

impl RunController {
    /// Create a controller writing exports into `output_dir`.
    pub fn new(output_dir: PathBuf, exports: Vec<SeriesExport>) -> Self {
        Self {
            names: EngineNames::default(),
            exports,
            output_dir,
        }
    }

    /// Apply `config` to the session, run to the stopping target, export
    /// the configured series, and save a checkpoint titled `title`.
    ///
    /// Returns the paths of the exported series files in export order.
    /// Raises on the first engine-port failure; no retries.
    pub fn execute<E: EnginePort>(
        &self,
        engine: &mut E,
        config: &RunConfig,
        title: &str,
    ) -> Result<Vec<PathBuf>, EngineError> {
        if let Some(dt) = config.timestep_s {
            engine.set_timestep(dt)?;
        }
        if let Some(v) = config.inlet_velocity {
            engine.set_condition(&self.names.inlet_boundary, &self.names.inlet_variable, v)?;
        }
        if let Some(mfr) = config.exhaust_flow_kgps {
            engine.set_condition(
                &self.names.exhaust_boundary,
                &self.names.exhaust_variable,
                mfr,
            )?;
        }
        if let Some(rpm) = config.rotation_rpm {
            engine.set_rotation_rate(&self.names.rotation_motion, rpm)?;
        }

        debug!(title, stopping = ?config.stopping, "running");
        match config.stopping {
            StoppingRule::FixedSteps(n) => engine.step(n)?,
            StoppingRule::MaxTime(t) => {
                engine.run_until_time(&self.names.max_time_criterion, t)?
            }
        }

        let mut paths = Vec::with_capacity(self.exports.len());
        for export in &self.exports {
            let path = self
                .output_dir
                .join(format!("{}_{}.csv", title, export.suffix));
            engine.export_series(&export.plot, &path)?;
            paths.push(path);
        }

        engine.save_checkpoint(title)?;
        Ok(paths)
    }
}

//! Scripted in-memory engine for tests.
//!
//! Records every port call and serves canned monitor values and plot
//! exports, so sweeps can run end-to-end without a live session. Names can
//! be marked absent to exercise the configuration-error path.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::{EngineError, EnginePort, ObjectKind};
use crate::frame::Vec3;

/// Canned value sequence for one monitor. Reads past the end repeat the
/// last value.
#[derive(Clone, Debug)]
struct MonitorScript {
    values: Vec<f64>,
    cursor: usize,
}

impl MonitorScript {
    fn next(&mut self) -> f64 {
        let i = self.cursor.min(self.values.len() - 1);
        self.cursor += 1;
        self.values[i]
    }
}

/// Recording fake implementation of [`EnginePort`].
///
/// All recorded call lists are public so tests can assert on call order,
/// counts, and arguments directly.
#[derive(Default)]
pub struct ScriptedEngine {
    missing: HashSet<String>,
    monitors: HashMap<String, MonitorScript>,
    plots: HashMap<String, String>,

    /// `(frame, origin)` per `set_frame_origin` call, in order.
    pub frame_origins: Vec<(String, Vec3)>,
    /// `(frame, basis index, vector)` per basis call, in order.
    pub frame_bases: Vec<(String, u8, Vec3)>,
    /// `(operation, control, vector)` per `set_translation` call.
    pub translations: Vec<(String, String, Vec3)>,
    /// `(operation, control, degrees)` per `set_rotation_angle` call.
    pub rotations: Vec<(String, String, f64)>,
    /// Number of `rebuild_mesh` calls.
    pub rebuilds: usize,
    /// `(name, variable, value)` per `set_condition` call.
    pub conditions: Vec<(String, String, f64)>,
    /// `(motion, rpm)` per `set_rotation_rate` call.
    pub rotation_rates: Vec<(String, f64)>,
    /// Timestep per `set_timestep` call.
    pub timesteps: Vec<f64>,
    /// Iteration count per `step` call.
    pub step_counts: Vec<usize>,
    /// `(criterion, max time)` per `run_until_time` call.
    pub time_targets: Vec<(String, f64)>,
    /// Monitor name per `read_monitor` call.
    pub monitor_reads: Vec<String>,
    /// `(plot, path)` per `export_series` call.
    pub series_exports: Vec<(String, PathBuf)>,
    /// Title per `save_checkpoint` call.
    pub checkpoints: Vec<String>,
    /// `(scene, path)` per `export_scene` call.
    pub scene_exports: Vec<(String, PathBuf)>,
}

impl ScriptedEngine {
    /// Create an empty scripted engine. Every name resolves until marked
    /// missing; monitors and plots must be scripted before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make lookups of `name` fail with [`EngineError::ObjectNotFound`].
    pub fn mark_missing(&mut self, name: &str) {
        self.missing.insert(name.to_string());
    }

    /// Script a monitor to return `value` on every read.
    pub fn set_monitor(&mut self, name: &str, value: f64) {
        self.set_monitor_sequence(name, vec![value]);
    }

    /// Script a monitor to return `values` on successive reads, repeating
    /// the last value once exhausted.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn set_monitor_sequence(&mut self, name: &str, values: Vec<f64>) {
        assert!(!values.is_empty(), "monitor script must not be empty");
        self.monitors
            .insert(name.to_string(), MonitorScript { values, cursor: 0 });
    }

    /// Script a plot: `export_series` writes `contents` verbatim to the
    /// requested path.
    pub fn set_plot(&mut self, name: &str, contents: &str) {
        self.plots.insert(name.to_string(), contents.to_string());
    }

    fn resolve(&self, kind: ObjectKind, name: &str) -> Result<(), EngineError> {
        if self.missing.contains(name) {
            return Err(EngineError::ObjectNotFound {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

impl EnginePort for ScriptedEngine {
    fn set_frame_origin(&mut self, frame: &str, origin: Vec3) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Frame, frame)?;
        self.frame_origins.push((frame.to_string(), origin));
        Ok(())
    }

    fn set_frame_basis0(&mut self, frame: &str, basis0: Vec3) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Frame, frame)?;
        self.frame_bases.push((frame.to_string(), 0, basis0));
        Ok(())
    }

    fn set_frame_basis1(&mut self, frame: &str, basis1: Vec3) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Frame, frame)?;
        self.frame_bases.push((frame.to_string(), 1, basis1));
        Ok(())
    }

    fn set_translation(
        &mut self,
        operation: &str,
        control: &str,
        vector: Vec3,
    ) -> Result<(), EngineError> {
        self.resolve(ObjectKind::MeshOperation, operation)?;
        self.resolve(ObjectKind::MeshOperation, control)?;
        self.translations
            .push((operation.to_string(), control.to_string(), vector));
        Ok(())
    }

    fn set_rotation_angle(
        &mut self,
        operation: &str,
        control: &str,
        degrees: f64,
    ) -> Result<(), EngineError> {
        self.resolve(ObjectKind::MeshOperation, operation)?;
        self.resolve(ObjectKind::MeshOperation, control)?;
        self.rotations
            .push((operation.to_string(), control.to_string(), degrees));
        Ok(())
    }

    fn rebuild_mesh(&mut self) -> Result<(), EngineError> {
        self.rebuilds += 1;
        Ok(())
    }

    fn set_condition(
        &mut self,
        name: &str,
        variable: &str,
        value: f64,
    ) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Condition, name)?;
        self.conditions
            .push((name.to_string(), variable.to_string(), value));
        Ok(())
    }

    fn set_rotation_rate(&mut self, motion: &str, rpm: f64) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Motion, motion)?;
        self.rotation_rates.push((motion.to_string(), rpm));
        Ok(())
    }

    fn set_timestep(&mut self, dt_s: f64) -> Result<(), EngineError> {
        self.timesteps.push(dt_s);
        Ok(())
    }

    fn step(&mut self, n: usize) -> Result<(), EngineError> {
        self.step_counts.push(n);
        Ok(())
    }

    fn run_until_time(&mut self, criterion: &str, max_time_s: f64) -> Result<(), EngineError> {
        self.resolve(ObjectKind::StoppingCriterion, criterion)?;
        self.time_targets.push((criterion.to_string(), max_time_s));
        Ok(())
    }

    fn read_monitor(&mut self, monitor: &str) -> Result<f64, EngineError> {
        self.resolve(ObjectKind::Monitor, monitor)?;
        self.monitor_reads.push(monitor.to_string());
        match self.monitors.get_mut(monitor) {
            Some(script) => Ok(script.next()),
            None => Err(EngineError::ObjectNotFound {
                kind: ObjectKind::Monitor,
                name: monitor.to_string(),
            }),
        }
    }

    fn export_series(&mut self, plot: &str, path: &Path) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Plot, plot)?;
        let contents = self
            .plots
            .get(plot)
            .ok_or_else(|| EngineError::ObjectNotFound {
                kind: ObjectKind::Plot,
                name: plot.to_string(),
            })?;
        std::fs::write(path, contents)
            .map_err(|e| EngineError::Session(format!("export of '{}' failed: {}", plot, e)))?;
        self.series_exports.push((plot.to_string(), path.to_path_buf()));
        Ok(())
    }

    fn save_checkpoint(&mut self, title: &str) -> Result<(), EngineError> {
        self.checkpoints.push(title.to_string());
        Ok(())
    }

    fn export_scene(&mut self, scene: &str, path: &Path) -> Result<(), EngineError> {
        self.resolve(ObjectKind::Scene, scene)?;
        self.scene_exports.push((scene.to_string(), path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_is_a_configuration_error() {
        let mut engine = ScriptedEngine::new();
        engine.mark_missing("Rotation");

        let err = engine.set_rotation_rate("Rotation", 3000.0).unwrap_err();
        match err {
            EngineError::ObjectNotFound { kind, name } => {
                assert_eq!(kind, ObjectKind::Motion);
                assert_eq!(name, "Rotation");
            }
            other => panic!("expected ObjectNotFound, got {:?}", other),
        }
    }

    #[test]
    fn monitor_sequence_repeats_last_value() {
        let mut engine = ScriptedEngine::new();
        engine.set_monitor_sequence("Fx", vec![1.0, 2.0]);

        assert_eq!(engine.read_monitor("Fx").unwrap(), 1.0);
        assert_eq!(engine.read_monitor("Fx").unwrap(), 2.0);
        assert_eq!(engine.read_monitor("Fx").unwrap(), 2.0);
        assert_eq!(engine.monitor_reads.len(), 3);
    }

    #[test]
    fn unscripted_monitor_is_missing() {
        let mut engine = ScriptedEngine::new();
        assert!(matches!(
            engine.read_monitor("Fy"),
            Err(EngineError::ObjectNotFound { .. })
        ));
    }
}

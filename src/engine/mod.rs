//! Port onto the external simulation engine session.
//!
//! The engine is a stateful CFD session owned by an external process. Every
//! object inside it — coordinate frames, mesh transform operations, boundary
//! conditions, motions, monitors, plots, scenes — is addressed by a stable
//! string name looked up in the live session. This module reduces that
//! surface to the narrow capability set the sweep driver needs, so the whole
//! driver can run against [`ScriptedEngine`] in tests without a real session.
//!
//! All operations are blocking; [`EnginePort::step`] dominates wall time.
//! The session is a single exclusively-owned mutable resource, so the port
//! is threaded through the sweep as `&mut E`.

mod scripted;

pub use scripted::ScriptedEngine;

use std::path::Path;

use thiserror::Error;

use crate::frame::Vec3;

/// Kind of named engine object, for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Local coordinate system.
    Frame,
    /// Mesh transform operation (translate/rotate control).
    MeshOperation,
    /// Boundary condition or other scalar condition holder.
    Condition,
    /// Rotating motion.
    Motion,
    /// Scalar report monitor.
    Monitor,
    /// Monitor plot exportable as a time series.
    Plot,
    /// Visualization scene.
    Scene,
    /// Named stopping criterion.
    StoppingCriterion,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectKind::Frame => "coordinate system",
            ObjectKind::MeshOperation => "mesh operation",
            ObjectKind::Condition => "condition",
            ObjectKind::Motion => "motion",
            ObjectKind::Monitor => "monitor",
            ObjectKind::Plot => "plot",
            ObjectKind::Scene => "scene",
            ObjectKind::StoppingCriterion => "stopping criterion",
        };
        f.write_str(s)
    }
}

/// Error type for engine session operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A named object is absent from the session. The session does not match
    /// the sweep script, so nothing later can succeed: always fatal.
    #[error("no {kind} named '{name}' in the engine session")]
    ObjectNotFound {
        /// What kind of object was looked up.
        kind: ObjectKind,
        /// The name that failed to resolve.
        name: String,
    },

    /// The engine reported a failure while executing an operation
    /// (diverged step, failed checkpoint write, export failure).
    #[error("engine session error: {0}")]
    Session(String),
}

/// Capability set of the engine session.
///
/// One method per named-object operation the sweep performs. Implementations
/// translate these into the engine's own scripting calls; [`ScriptedEngine`]
/// records them for assertions instead.
pub trait EnginePort {
    /// Set the origin of a named local coordinate system.
    fn set_frame_origin(&mut self, frame: &str, origin: Vec3) -> Result<(), EngineError>;

    /// Set the first basis vector of a named local coordinate system.
    fn set_frame_basis0(&mut self, frame: &str, basis0: Vec3) -> Result<(), EngineError>;

    /// Set the second basis vector of a named local coordinate system.
    fn set_frame_basis1(&mut self, frame: &str, basis1: Vec3) -> Result<(), EngineError>;

    /// Set the translation vector of a control inside a mesh transform
    /// operation.
    fn set_translation(
        &mut self,
        operation: &str,
        control: &str,
        vector: Vec3,
    ) -> Result<(), EngineError>;

    /// Set the rotation angle (degrees) of a control inside a mesh transform
    /// operation.
    fn set_rotation_angle(
        &mut self,
        operation: &str,
        control: &str,
        degrees: f64,
    ) -> Result<(), EngineError>;

    /// Clear the solution and re-execute all mesh operations.
    fn rebuild_mesh(&mut self) -> Result<(), EngineError>;

    /// Set a named scalar condition, e.g. an inlet velocity magnitude or an
    /// exhaust mass flow rate.
    fn set_condition(
        &mut self,
        name: &str,
        variable: &str,
        value: f64,
    ) -> Result<(), EngineError>;

    /// Set the rotation rate (rpm) of a named motion.
    fn set_rotation_rate(&mut self, motion: &str, rpm: f64) -> Result<(), EngineError>;

    /// Set the solver timestep in seconds.
    fn set_timestep(&mut self, dt_s: f64) -> Result<(), EngineError>;

    /// Advance the solver by `n` iterations, blocking until done.
    fn step(&mut self, n: usize) -> Result<(), EngineError>;

    /// Run until the named maximum-physical-time stopping criterion reaches
    /// `max_time_s`, blocking until done.
    fn run_until_time(&mut self, criterion: &str, max_time_s: f64) -> Result<(), EngineError>;

    /// Read the current scalar value of a named monitor.
    fn read_monitor(&mut self, monitor: &str) -> Result<f64, EngineError>;

    /// Export a named monitor plot as a delimited time series file
    /// (row 0 = header, column 0 = iteration index).
    fn export_series(&mut self, plot: &str, path: &Path) -> Result<(), EngineError>;

    /// Save a checkpoint of the session state under the given title.
    fn save_checkpoint(&mut self, title: &str) -> Result<(), EngineError>;

    /// Export a named scene to the given path.
    fn export_scene(&mut self, scene: &str, path: &Path) -> Result<(), EngineError>;
}

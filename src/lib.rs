//! # hydrosweep
//!
//! A batch driver for multi-dimensional parameter sweeps of physical
//! configurations against an external, stateful CFD session.
//!
//! This crate provides the pieces a parametric study needs:
//! - Coordinate-frame composition from sweep angles (hull pose, drive
//!   trim chains)
//! - Run control (timestep and step-count derivation, exhaust scaling,
//!   fixed-step and ramped max-time stopping, checkpointing)
//! - Windowed statistical aggregation of monitor series over the trailing
//!   revolution
//! - Nondimensional propeller coefficients (SHP, J, KT, KQ, eta) with
//!   per-mesh submerged-area calibration
//! - An idempotent tabular result store
//! - Sweep orchestration with per-mode failure policies
//!
//! The engine itself stays behind the narrow [`engine::EnginePort`] trait;
//! [`engine::ScriptedEngine`] stands in for it in tests.
//!
//! Execution is single-threaded and synchronous throughout: the session is
//! one exclusively-owned mutable resource, and wall time is dominated by
//! blocking step calls.

pub mod aggregate;
pub mod engine;
pub mod frame;
pub mod io;
pub mod run;
pub mod sweep;

// Re-export main types for convenience
pub use aggregate::{
    aggregate_revolution, propeller_coefficients, AggregateError, AggregateReport, Calibration,
    ChannelSpec, ChannelStat, PropellerCoefficients, WindowStats,
};
pub use engine::{EngineError, EnginePort, ObjectKind, ScriptedEngine};
pub use frame::{
    attitude_frames, propeller_frames, Attitude, AttitudeFrames, CoordinateFrame,
    PropellerFrames, TrimGeometry, Vec3,
};
pub use io::{read_series_file, MonitorSeries, SeriesFileError, TableError};
pub use run::{
    EngineNames, RunConfig, RunController, SeriesExport, StoppingRamp, StoppingRule,
};
pub use sweep::{
    AttitudePoint, AttitudeSweep, FailurePolicy, LadderStopping, MeshCounter, MeshIndex,
    PropellerGeometry, PropellerPoint, PropellerSweep, SweepError, SweepSummary,
};

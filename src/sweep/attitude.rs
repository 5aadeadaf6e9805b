//! Hull attitude sweep.
//!
//! Nested order: sink → pitch → yaw → speed, speed fastest. The speed set
//! is conditional on yaw: a zero-yaw hull is swept over the full forward
//! speed range, while any yawed hull uses the shorter off-axis set (drag
//! grows quickly off axis and the high-speed points stop converging). The
//! yaw comparison is exact, since zero is an exact grid value.
//!
//! Each point re-poses the hull (mesh transforms plus the attitude frame
//! chain), rebuilds the mesh, runs a fixed iteration count, and reads each
//! report monitor's current value into one result row. No windowing and no
//! derived coefficients: these are steady configuration runs.
//!
//! Failure policy: continue-on-error. A diverged or unwritable point is
//! logged and skipped; the rest of the matrix is still worth having.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::aggregate::instantaneous_value;
use crate::engine::EnginePort;
use crate::frame::{
    attitude_frames, sink_translation, Attitude, ROLL_TRIM_FRAME, SINK_FRAME, YAW_FRAME,
};
use crate::io::{append_row, ensure_table, Cell};
use crate::run::{EngineNames, RunConfig, RunController, StoppingRule};
use crate::sweep::{absorb_point_failure, FailurePolicy, SweepError, SweepSummary};

/// Mesh transform operation posing the hull.
pub const TRANSFORM_OPERATION: &str = "Transform";
/// Roll rotation control inside [`TRANSFORM_OPERATION`].
pub const ROLL_CONTROL: &str = "roll";
/// Pitch rotation control inside [`TRANSFORM_OPERATION`].
pub const PITCH_CONTROL: &str = "pitch";
/// Yaw rotation control inside [`TRANSFORM_OPERATION`].
pub const YAW_CONTROL: &str = "yaw";
/// Sink translation control inside [`TRANSFORM_OPERATION`].
pub const SINK_CONTROL: &str = "sink";

/// One attitude sweep point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttitudePoint {
    /// Sink below the waterline (in).
    pub sink_in: f64,
    /// Pitch angle (deg).
    pub pitch_deg: f64,
    /// Yaw angle (deg).
    pub yaw_deg: f64,
    /// Tow speed (ft/s).
    pub speed_fps: f64,
}

/// Configuration of an attitude sweep.
#[derive(Clone, Debug)]
pub struct AttitudeSweep {
    /// Run title prefix for checkpoints and exports.
    pub label: String,
    /// Sink values (in), outermost dimension.
    pub sinks_in: Vec<f64>,
    /// Pitch angles (deg).
    pub pitches_deg: Vec<f64>,
    /// Yaw angles (deg).
    pub yaws_deg: Vec<f64>,
    /// Speed set for yaw == 0 (ft/s).
    pub forward_speeds_fps: Vec<f64>,
    /// Speed set for any other yaw (ft/s).
    pub offaxis_speeds_fps: Vec<f64>,
    /// Fixed roll angle (deg) applied to every point.
    pub roll_deg: f64,
    /// Solver iterations per point.
    pub iterations: usize,
    /// Report monitors read into the result row, in column order.
    pub monitors: Vec<String>,
    /// Scene exported during post-processing, if any.
    pub scene: Option<String>,
    /// Directory receiving scenes and the result table.
    pub output_dir: PathBuf,
    /// Engine object names.
    pub names: EngineNames,
    /// Failure policy; continue-on-error for this mode.
    pub policy: FailurePolicy,
}

impl AttitudeSweep {
    /// Sweep skeleton with conventional names, the standard report set,
    /// and a continue-on-error policy; dimensions still to be filled in.
    pub fn new(label: &str, output_dir: PathBuf) -> Self {
        Self {
            label: label.to_string(),
            sinks_in: Vec::new(),
            pitches_deg: Vec::new(),
            yaws_deg: Vec::new(),
            forward_speeds_fps: Vec::new(),
            offaxis_speeds_fps: Vec::new(),
            roll_deg: 0.0,
            iterations: 500,
            monitors: ["Fx", "Fy", "Fz", "Mx", "My", "Mz", "Lift", "Drag"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            scene: None,
            output_dir,
            names: EngineNames::default(),
            policy: FailurePolicy::ContinueOnError,
        }
    }

    /// Speed set active at the given yaw.
    pub fn speeds_for_yaw(&self, yaw_deg: f64) -> &[f64] {
        if yaw_deg == 0.0 {
            &self.forward_speeds_fps
        } else {
            &self.offaxis_speeds_fps
        }
    }

    /// All sweep points in enumeration order.
    pub fn points(&self) -> Vec<AttitudePoint> {
        let mut points = Vec::new();
        for &sink_in in &self.sinks_in {
            for &pitch_deg in &self.pitches_deg {
                for &yaw_deg in &self.yaws_deg {
                    for &speed_fps in self.speeds_for_yaw(yaw_deg) {
                        points.push(AttitudePoint {
                            sink_in,
                            pitch_deg,
                            yaw_deg,
                            speed_fps,
                        });
                    }
                }
            }
        }
        points
    }

    /// Path of the sweep's result table.
    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join("results.csv")
    }

    /// Result table header: point columns, then one per monitor.
    pub fn table_header(&self) -> Vec<&str> {
        let mut header = vec!["Sink", "Pitch", "Yaw", "Speed"];
        header.extend(self.monitors.iter().map(String::as_str));
        header
    }

    fn point_title(&self, point: &AttitudePoint) -> String {
        format!(
            "{}_sink{}_roll{}_pitch{}_yaw{}_speed{}",
            self.label, point.sink_in, self.roll_deg, point.pitch_deg, point.yaw_deg,
            point.speed_fps
        )
    }

    /// Run the sweep against the engine session.
    ///
    /// Under the default continue-on-error policy, recoverable per-point
    /// post-processing failures are logged and counted in the summary;
    /// configuration errors and run failures abort.
    pub fn run<E: EnginePort>(&self, engine: &mut E) -> Result<SweepSummary, SweepError> {
        let controller = RunController {
            names: self.names.clone(),
            exports: Vec::new(),
            output_dir: self.output_dir.clone(),
        };
        let mut summary = SweepSummary::default();

        info!(
            label = %self.label,
            points = self.points().len(),
            "starting attitude sweep"
        );

        for &sink_in in &self.sinks_in {
            for &pitch_deg in &self.pitches_deg {
                for &yaw_deg in &self.yaws_deg {
                    self.pose_hull(engine, sink_in, pitch_deg, yaw_deg)?;

                    for &speed_fps in self.speeds_for_yaw(yaw_deg) {
                        let point = AttitudePoint {
                            sink_in,
                            pitch_deg,
                            yaw_deg,
                            speed_fps,
                        };
                        let title = self.point_title(&point);
                        debug!(%title, "sweep point");

                        let config = RunConfig {
                            timestep_s: None,
                            stopping: StoppingRule::FixedSteps(self.iterations),
                            inlet_velocity: Some(speed_fps),
                            exhaust_flow_kgps: None,
                            rotation_rpm: None,
                        };
                        controller.execute(engine, &config, &title)?;

                        match self.post_point(engine, &point, &title) {
                            Ok(()) => summary.completed += 1,
                            Err(e) => {
                                absorb_point_failure(self.policy, e, &title, &mut summary)?
                            }
                        }
                    }
                }
            }
        }

        info!(
            completed = summary.completed,
            failed = summary.failed,
            "attitude sweep finished"
        );
        Ok(summary)
    }

    fn pose_hull<E: EnginePort>(
        &self,
        engine: &mut E,
        sink_in: f64,
        pitch_deg: f64,
        yaw_deg: f64,
    ) -> Result<(), SweepError> {
        engine.set_rotation_angle(TRANSFORM_OPERATION, ROLL_CONTROL, self.roll_deg)?;
        engine.set_rotation_angle(TRANSFORM_OPERATION, PITCH_CONTROL, pitch_deg)?;
        engine.set_rotation_angle(TRANSFORM_OPERATION, YAW_CONTROL, yaw_deg)?;
        engine.set_translation(TRANSFORM_OPERATION, SINK_CONTROL, sink_translation(sink_in))?;

        let frames = attitude_frames(&Attitude {
            sink_in,
            roll_deg: self.roll_deg,
            pitch_deg,
            yaw_deg,
        });
        engine.set_frame_origin(SINK_FRAME, frames.sink.origin)?;
        engine.set_frame_basis0(YAW_FRAME, frames.yaw.basis0)?;
        engine.set_frame_basis1(ROLL_TRIM_FRAME, frames.roll_trim.basis1)?;
        engine.set_frame_basis0(ROLL_TRIM_FRAME, frames.roll_trim.basis0)?;

        engine.rebuild_mesh()?;
        Ok(())
    }

    fn post_point<E: EnginePort>(
        &self,
        engine: &mut E,
        point: &AttitudePoint,
        title: &str,
    ) -> Result<(), SweepError> {
        if let Some(scene) = &self.scene {
            let path = self.output_dir.join(format!("{}.png", title));
            engine.export_scene(scene, &path)?;
        }

        let table = self.result_path();
        ensure_table(&table, &self.table_header())?;

        let mut cells: Vec<Cell> = vec![
            point.sink_in.into(),
            point.pitch_deg.into(),
            point.yaw_deg.into(),
            point.speed_fps.into(),
        ];
        for monitor in &self.monitors {
            let value = engine.read_monitor(monitor)?;
            cells.push(instantaneous_value(monitor, value)?.into());
        }
        append_row(&table, &cells)?;
        Ok(())
    }
}

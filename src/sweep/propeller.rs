//! Propeller parametric sweep.
//!
//! Nested order: speed → height → trim → rpm, rpm fastest. The trim
//! dimension is the mesh-affecting one: each trim value rotates the drive
//! and rebuilds the volume mesh once, and every rpm point on that mesh
//! shares its submerged-area calibration ratio. The mesh counter resets
//! when the speed changes, matching the calibration table layout.
//!
//! Each point runs the transient rotating-mesh solver for a whole number
//! of revolutions (a longer warm-up for the first rpm of each ladder),
//! exports the propeller and gearcase monitor series, aggregates the
//! trailing revolution, derives the coefficient set, and appends one row
//! to the result table.
//!
//! Failure policy: abort-on-error. A propeller ladder is only comparable
//! if every point on it converged, so the sweep stops at the first failure.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::aggregate::{
    aggregate_revolution, propeller_coefficients, AggregateReport, Calibration, ChannelSpec,
};
use crate::engine::EnginePort;
use crate::frame::{
    heave_translation, propeller_frames, refinement_translation, TrimGeometry,
    GC_CENTER_FRAME, PROP_CENTER_FRAME, TRIM_CENTER_FRAME,
};
use crate::io::{append_row, ensure_table, read_series_file, Cell};
use crate::run::{
    exhaust_flow_kgps, revolution_steps, step_count, timestep_s, EngineNames, RunConfig,
    RunController, SeriesExport, StoppingRamp, StoppingRule,
};
use crate::sweep::{
    absorb_point_failure, FailurePolicy, MeshCounter, MeshIndex, SweepError, SweepSummary,
};

/// Monitor plot holding the propeller channel group.
pub const PROP_PLOT: &str = "Prop";
/// Monitor plot holding the gearcase channel group.
pub const GEARCASE_PLOT: &str = "Gearcase";

/// Mesh operation names for the drive pose.
pub const TRANSLATE_OPERATION: &str = "Translate";
/// Heave control inside [`TRANSLATE_OPERATION`].
pub const HEAVE_CONTROL: &str = "Heave";
/// Rotate operation carrying the trim angle.
pub const ROTATE_OPERATION: &str = "Rotate";
/// Pitch control inside [`ROTATE_OPERATION`].
pub const PITCH_CONTROL: &str = "Pitch";
/// Translate operation keeping the outer refinement zone on the drive.
pub const REFINE_OPERATION: &str = "Translate_Refine_Outer";
/// Translate control inside [`REFINE_OPERATION`].
pub const REFINE_CONTROL: &str = "Translate";

/// Named condition carrying the free-stream wave.
pub const WAVE_CONDITION: &str = "FlatVofWave 1";
/// Named field function whose reference velocity tracks the tow speed.
pub const PRESSURE_COEFFICIENT: &str = "Pressure Coefficient";

/// Thrust channel feeding KT.
const THRUST_NET_CHANNEL: &str = "Thrust Net";
/// Torque channel feeding SHP and KQ.
const TORQUE_CHANNEL: &str = "Torque";

/// How each rpm ladder stops.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LadderStopping {
    /// Run a whole number of revolutions per point: a longer warm-up for
    /// the first rpm of each ladder, fewer once the flow field is settled.
    Revolutions {
        /// Revolutions for the first rpm of each ladder.
        warmup: f64,
        /// Revolutions for subsequent rpms.
        settled: f64,
    },
    /// Run each point until the engine's max-time criterion, ramping the
    /// target by a fixed increment per rpm so every point accumulates the
    /// same additional settled time. The ramp restarts with each ladder.
    TimeRamp {
        /// Target for the first rpm of each ladder (s).
        start_s: f64,
        /// Added per subsequent rpm (s).
        increment_s: f64,
    },
}

/// Per-ladder stopping state, restarted with each trim's rpm ladder.
enum LadderState {
    Revolutions { warmup: f64, settled: f64 },
    Ramp(StoppingRamp),
}

impl LadderState {
    fn start(stopping: LadderStopping) -> Self {
        match stopping {
            LadderStopping::Revolutions { warmup, settled } => {
                LadderState::Revolutions { warmup, settled }
            }
            LadderStopping::TimeRamp {
                start_s,
                increment_s,
            } => LadderState::Ramp(StoppingRamp::new(start_s, increment_s)),
        }
    }

    fn next_rule(&mut self, point_index: usize, step_deg: f64) -> StoppingRule {
        match self {
            LadderState::Revolutions { warmup, settled } => {
                let revolutions = if point_index == 0 { *warmup } else { *settled };
                StoppingRule::FixedSteps(step_count(revolutions, step_deg))
            }
            LadderState::Ramp(ramp) => StoppingRule::MaxTime(ramp.next_target()),
        }
    }
}

/// Drive geometry for one propeller configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropellerGeometry {
    /// Propeller diameter (in).
    pub diameter_in: f64,
    /// Trim pivot offsets.
    pub trim: TrimGeometry,
}

/// One propeller sweep point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropellerPoint {
    /// Tow speed (mph).
    pub speed_mph: f64,
    /// Propshaft depth below the waterline at level trim (in).
    pub height_in: f64,
    /// Trim angle (deg), positive trimmed out.
    pub trim_deg: f64,
    /// Propeller rotation rate (rpm).
    pub rpm: f64,
}

/// Configuration of a propeller sweep.
#[derive(Clone, Debug)]
pub struct PropellerSweep {
    /// Configuration label, first column of every result row.
    pub label: String,
    /// Tow speeds (mph), outermost dimension.
    pub speeds_mph: Vec<f64>,
    /// Propshaft depths (in).
    pub heights_in: Vec<f64>,
    /// Trim angles (deg); mesh-affecting dimension.
    pub trims_deg: Vec<f64>,
    /// Rotation rates (rpm), innermost dimension.
    pub rpms: Vec<f64>,
    /// Degrees of rotation per timestep.
    pub step_deg: f64,
    /// Stopping mode for each rpm ladder.
    pub stopping: LadderStopping,
    /// Rated engine speed for exhaust scaling (rpm).
    pub rated_rpm: f64,
    /// Exhaust mass flow rate at rated speed (kg/s).
    pub rated_exhaust_kgps: f64,
    /// Drive geometry.
    pub geometry: PropellerGeometry,
    /// Per-mesh submerged-area ratios, one per trim value.
    pub calibration: Calibration,
    /// Scene exported after each run, if any.
    pub scene: Option<String>,
    /// Directory receiving series exports, scenes, and the result table.
    pub output_dir: PathBuf,
    /// Engine object names.
    pub names: EngineNames,
    /// Failure policy; abort-on-error for this mode.
    pub policy: FailurePolicy,
}

impl PropellerSweep {
    /// Sweep skeleton with conventional names and an abort-on-error policy;
    /// dimensions, geometry, and calibration still to be filled in.
    pub fn new(label: &str, output_dir: PathBuf) -> Self {
        Self {
            label: label.to_string(),
            speeds_mph: Vec::new(),
            heights_in: Vec::new(),
            trims_deg: Vec::new(),
            rpms: Vec::new(),
            step_deg: 1.0,
            stopping: LadderStopping::Revolutions {
                warmup: 4.0,
                settled: 2.0,
            },
            rated_rpm: 3543.0,
            rated_exhaust_kgps: 0.4,
            geometry: PropellerGeometry {
                diameter_in: 0.0,
                trim: TrimGeometry {
                    trim_point_x_in: 0.0,
                    trim_point_z_in: 0.0,
                    prop_x_in: 0.0,
                },
            },
            calibration: Calibration::new(Vec::new()),
            scene: None,
            output_dir,
            names: EngineNames::default(),
            policy: FailurePolicy::AbortOnError,
        }
    }

    /// All sweep points in enumeration order.
    pub fn points(&self) -> Vec<PropellerPoint> {
        let mut points = Vec::new();
        for &speed_mph in &self.speeds_mph {
            for &height_in in &self.heights_in {
                for &trim_deg in &self.trims_deg {
                    for &rpm in &self.rpms {
                        points.push(PropellerPoint {
                            speed_mph,
                            height_in,
                            trim_deg,
                            rpm,
                        });
                    }
                }
            }
        }
        points
    }

    /// Path of the sweep's result table.
    pub fn result_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}_results.csv", self.label))
    }

    /// Result table header, in fixed column order.
    pub fn table_header() -> Vec<&'static str> {
        vec![
            "Revision",
            "Speed (mph)",
            "Trim (deg)",
            "Height (in)",
            "RPM",
            "Prop Lift (lbf)",
            "Prop Sideforce (lbf)",
            "Prop Thrust Net (lbf)",
            "Prop Thrust Normal (lbf)",
            "Prop Pitch Moment (lbf-ft)",
            "Prop Yaw Moment (lbf-ft)",
            "Prop Thrust (lbf)",
            "Mean Blade Thrust (lbf)",
            "Max Blade Thrust (lbf)",
            "Min Blade Thrust (lbf)",
            "Prop Torque (lbf-ft)",
            "Mean Blade Torque (lbf-ft)",
            "Max Blade Torque (lbf-ft)",
            "Min Blade Torque (lbf-ft)",
            "SHP",
            "J",
            "KT_norm",
            "KQ_norm",
            "eta",
            "Gearcase Drag (lbf)",
            "Gearcase Lift (lbf)",
            "Gearcase Sideforce (lbf)",
            "Gearcase Pitch Moment (lbf-ft)",
            "Gearcase Roll Moment (lbf-ft)",
            "Gearcase Yaw Moment (lbf-ft)",
        ]
    }

    /// Aggregation rules for the propeller channel group. The per-blade
    /// channels carry the full mean/max/min spread; everything else means.
    pub fn prop_channel_specs() -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::mean("Lift"),
            ChannelSpec::mean("Sideforce"),
            ChannelSpec::mean(THRUST_NET_CHANNEL),
            ChannelSpec::mean("Thrust Normal"),
            ChannelSpec::mean("Pitch Moment"),
            ChannelSpec::mean("Yaw Moment"),
            ChannelSpec::mean("Thrust"),
            ChannelSpec::mean_max_min("Blade Thrust"),
            ChannelSpec::mean(TORQUE_CHANNEL),
            ChannelSpec::mean_max_min("Blade Torque"),
        ]
    }

    /// Aggregation rules for the gearcase channel group.
    pub fn gearcase_channel_specs() -> Vec<ChannelSpec> {
        vec![
            ChannelSpec::mean("Drag"),
            ChannelSpec::mean("Lift"),
            ChannelSpec::mean("Sideforce"),
            ChannelSpec::mean("Pitch Moment"),
            ChannelSpec::mean("Roll Moment"),
            ChannelSpec::mean("Yaw Moment"),
        ]
    }

    fn point_title(&self, point: &PropellerPoint) -> String {
        format!(
            "{}_{}mph_{}deg_{}in_{}rpm",
            self.label, point.speed_mph, point.trim_deg, point.height_in, point.rpm
        )
    }

    /// Run the sweep against the engine session.
    ///
    /// Returns the point accounting; under the default abort-on-error
    /// policy the first failure propagates instead.
    pub fn run<E: EnginePort>(&self, engine: &mut E) -> Result<SweepSummary, SweepError> {
        let controller = RunController {
            names: self.names.clone(),
            exports: vec![
                SeriesExport::new(PROP_PLOT, "prop"),
                SeriesExport::new(GEARCASE_PLOT, "gc"),
            ],
            output_dir: self.output_dir.clone(),
        };
        let prop_specs = Self::prop_channel_specs();
        let gearcase_specs = Self::gearcase_channel_specs();
        let window = revolution_steps(self.step_deg);
        let table = self.result_path();

        let mut mesh = MeshCounter::new();
        let mut summary = SweepSummary::default();

        info!(
            label = %self.label,
            points = self.points().len(),
            "starting propeller sweep"
        );

        for &speed_mph in &self.speeds_mph {
            engine.set_condition(WAVE_CONDITION, "Current", speed_mph)?;
            engine.set_condition(WAVE_CONDITION, "Wind", speed_mph)?;
            engine.set_condition(PRESSURE_COEFFICIENT, "Reference Velocity", speed_mph)?;
            mesh.reset();

            for &height_in in &self.heights_in {
                engine.set_translation(
                    TRANSLATE_OPERATION,
                    HEAVE_CONTROL,
                    heave_translation(height_in),
                )?;

                for &trim_deg in &self.trims_deg {
                    engine.set_rotation_angle(ROTATE_OPERATION, PITCH_CONTROL, trim_deg)?;
                    engine.set_translation(
                        REFINE_OPERATION,
                        REFINE_CONTROL,
                        refinement_translation(trim_deg, &self.geometry.trim),
                    )?;
                    engine.rebuild_mesh()?;
                    let mesh_index = mesh.advance();

                    self.apply_frames(engine, height_in, trim_deg)?;

                    let mut ladder = LadderState::start(self.stopping);

                    for (i, &rpm) in self.rpms.iter().enumerate() {
                        let point = PropellerPoint {
                            speed_mph,
                            height_in,
                            trim_deg,
                            rpm,
                        };
                        let title = self.point_title(&point);
                        debug!(%title, mesh = mesh_index.as_usize(), "sweep point");

                        let stopping = ladder.next_rule(i, self.step_deg);
                        let config = RunConfig {
                            timestep_s: Some(timestep_s(rpm, self.step_deg)),
                            stopping,
                            inlet_velocity: None,
                            exhaust_flow_kgps: Some(exhaust_flow_kgps(
                                rpm,
                                self.rated_rpm,
                                self.rated_exhaust_kgps,
                            )),
                            rotation_rpm: Some(rpm),
                        };

                        let exports = controller.execute(engine, &config, &title)?;
                        if let Some(scene) = &self.scene {
                            let path = self.output_dir.join(format!("{}.sce", title));
                            engine.export_scene(scene, &path)?;
                        }

                        let outcome = self.post_point(
                            &point,
                            mesh_index,
                            window,
                            &exports,
                            &prop_specs,
                            &gearcase_specs,
                            &table,
                        );
                        match outcome {
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
            "propeller sweep finished"
        );
        Ok(summary)
    }

    fn apply_frames<E: EnginePort>(
        &self,
        engine: &mut E,
        height_in: f64,
        trim_deg: f64,
    ) -> Result<(), SweepError> {
        let frames = propeller_frames(height_in, trim_deg, &self.geometry.trim);
        engine.set_frame_origin(TRIM_CENTER_FRAME, frames.trim_center.origin)?;
        engine.set_frame_basis0(TRIM_CENTER_FRAME, frames.trim_center.basis0)?;
        engine.set_frame_origin(GC_CENTER_FRAME, frames.gc_center.origin)?;
        engine.set_frame_origin(PROP_CENTER_FRAME, frames.prop_center.origin)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn post_point(
        &self,
        point: &PropellerPoint,
        mesh_index: MeshIndex,
        window: usize,
        exports: &[PathBuf],
        prop_specs: &[ChannelSpec],
        gearcase_specs: &[ChannelSpec],
        table: &Path,
    ) -> Result<(), SweepError> {
        let prop_series = read_series_file(&exports[0])?;
        let gearcase_series = read_series_file(&exports[1])?;

        let prop: AggregateReport = aggregate_revolution(&prop_series, prop_specs, window)?;
        let gearcase = aggregate_revolution(&gearcase_series, gearcase_specs, window)?;

        let ratio = self.calibration.ratio(mesh_index)?;
        let coefficients = propeller_coefficients(
            point.rpm,
            point.speed_mph,
            self.geometry.diameter_in,
            prop.mean(THRUST_NET_CHANNEL)?,
            prop.mean(TORQUE_CHANNEL)?,
            ratio,
        );

        ensure_table(table, &Self::table_header())?;
        let mut cells: Vec<Cell> = vec![
            Cell::text(self.label.clone()),
            point.speed_mph.into(),
            point.trim_deg.into(),
            point.height_in.into(),
            point.rpm.into(),
        ];
        cells.extend(prop.columns().into_iter().map(Cell::from));
        cells.extend(
            [
                coefficients.shp,
                coefficients.advance_ratio,
                coefficients.kt_norm,
                coefficients.kq_norm,
                coefficients.efficiency,
            ]
            .map(Cell::from),
        );
        cells.extend(gearcase.columns().into_iter().map(Cell::from));
        append_row(table, &cells)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn points_enumerate_rpm_fastest() {
        let mut sweep = PropellerSweep::new("v1", PathBuf::from("/tmp"));
        sweep.speeds_mph = vec![62.7, 58.6];
        sweep.heights_in = vec![7.19];
        sweep.trims_deg = vec![5.0, 7.5];
        sweep.rpms = vec![3135.0, 3265.5];

        let points = sweep.points();
        assert_eq!(points.len(), 8);
        // First ladder: all rpms at the first speed/height/trim.
        assert_eq!(points[0].rpm, 3135.0);
        assert_eq!(points[1].rpm, 3265.5);
        assert_eq!(points[0].trim_deg, 5.0);
        // Trim advances before speed does.
        assert_eq!(points[2].trim_deg, 7.5);
        assert_eq!(points[2].speed_mph, 62.7);
        assert_eq!(points[4].speed_mph, 58.6);
    }

    #[test]
    fn header_width_matches_point_and_channel_columns() {
        // 5 point columns + 14 propeller + 5 derived + 6 gearcase.
        assert_eq!(PropellerSweep::table_header().len(), 30);

        let prop_cols: usize = PropellerSweep::prop_channel_specs()
            .iter()
            .map(|s| match s.stat {
                crate::aggregate::ChannelStat::Mean => 1,
                crate::aggregate::ChannelStat::MeanMaxMin => 3,
            })
            .sum();
        assert_eq!(prop_cols, 14);
        assert_eq!(PropellerSweep::gearcase_channel_specs().len(), 6);
    }
}

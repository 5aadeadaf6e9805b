//! Integration tests for the propeller sweep.
//!
//! Runs the full sweep pipeline against the scripted engine: frame setup,
//! run control, series export, windowed aggregation, coefficient
//! derivation, and table persistence.

use std::path::PathBuf;

use approx::assert_relative_eq;
use tempfile::tempdir;

use hydrosweep::aggregate::Calibration;
use hydrosweep::engine::ScriptedEngine;
use hydrosweep::frame::TrimGeometry;
use hydrosweep::io::read_table;
use hydrosweep::sweep::{LadderStopping, PropellerGeometry, PropellerSweep};

const PROP_CHANNELS: &[&str] = &[
    "Lift",
    "Sideforce",
    "Thrust Net",
    "Thrust Normal",
    "Pitch Moment",
    "Yaw Moment",
    "Thrust",
    "Blade Thrust",
    "Torque",
    "Blade Torque",
];

const GC_CHANNELS: &[&str] = &[
    "Drag",
    "Lift",
    "Sideforce",
    "Pitch Moment",
    "Roll Moment",
    "Yaw Moment",
];

/// Propeller series: two garbage start-up rows, then a window's worth of
/// steady data. Thrust Net = 100, Torque = 50; the blade channels
/// alternate so max and min differ from the mean.
fn prop_series_csv() -> String {
    let mut csv = format!("Iteration,{}\n", PROP_CHANNELS.join(","));
    // Start-up transient, excluded by the revolution window.
    csv.push_str("1,1e9,1e9,1e9,1e9,1e9,1e9,1e9,1e9,1e9,1e9\n");
    csv.push_str("2,-1e9,-1e9,-1e9,-1e9,-1e9,-1e9,-1e9,-1e9,-1e9,-1e9\n");
    for i in 3..=6 {
        let blade_thrust = if i % 2 == 0 { 30.0 } else { 10.0 };
        let blade_torque = if i % 2 == 0 { 15.0 } else { 5.0 };
        csv.push_str(&format!(
            "{},1,2,100,3,4,5,6,{},50,{}\n",
            i, blade_thrust, blade_torque
        ));
    }
    csv
}

fn gc_series_csv() -> String {
    let mut csv = format!("Iteration,{}\n", GC_CHANNELS.join(","));
    for i in 1..=6 {
        csv.push_str(&format!("{},7,8,9,10,11,12\n", i));
    }
    csv
}

fn test_sweep(output_dir: PathBuf) -> PropellerSweep {
    let mut sweep = PropellerSweep::new("hub_v1", output_dir);
    sweep.speeds_mph = vec![60.0, 40.0];
    sweep.heights_in = vec![7.0];
    sweep.trims_deg = vec![5.0, 7.5];
    sweep.rpms = vec![3000.0, 3600.0];
    sweep.step_deg = 90.0; // 4 steps per revolution keeps test series short
    sweep.stopping = LadderStopping::Revolutions {
        warmup: 2.0,
        settled: 1.0,
    };
    sweep.rated_rpm = 3600.0;
    sweep.rated_exhaust_kgps = 0.4;
    sweep.geometry = PropellerGeometry {
        diameter_in: 14.5,
        trim: TrimGeometry {
            trim_point_x_in: 11.1,
            trim_point_z_in: 43.19,
            prop_x_in: 13.19,
        },
    };
    sweep.calibration = Calibration::new(vec![0.8, 0.5]);
    sweep
}

fn scripted_engine() -> ScriptedEngine {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut engine = ScriptedEngine::new();
    engine.set_plot("Prop", &prop_series_csv());
    engine.set_plot("Gearcase", &gc_series_csv());
    engine
}

#[test]
fn sweep_appends_one_row_per_point_in_order() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    let summary = sweep.run(&mut engine).unwrap();

    assert_eq!(summary.completed, 8);
    assert_eq!(summary.failed, 0);

    let rows = read_table(&sweep.result_path()).unwrap();
    assert_eq!(rows.len(), 9, "header plus eight data rows");
    assert_eq!(rows[0].len(), 30);

    // Enumeration order: rpm fastest, then trim, then speed.
    let points: Vec<(f64, f64, f64)> = rows[1..]
        .iter()
        .map(|r| {
            (
                r[1].parse().unwrap(), // speed
                r[2].parse().unwrap(), // trim
                r[4].parse().unwrap(), // rpm
            )
        })
        .collect();
    assert_eq!(
        points,
        vec![
            (60.0, 5.0, 3000.0),
            (60.0, 5.0, 3600.0),
            (60.0, 7.5, 3000.0),
            (60.0, 7.5, 3600.0),
            (40.0, 5.0, 3000.0),
            (40.0, 5.0, 3600.0),
            (40.0, 7.5, 3000.0),
            (40.0, 7.5, 3600.0),
        ]
    );
    // Every row carries the configuration label.
    assert!(rows[1..].iter().all(|r| r[0] == "hub_v1"));
}

#[test]
fn windowed_statistics_ignore_the_startup_transient() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();
    let rows = read_table(&sweep.result_path()).unwrap();
    let row = &rows[1];

    // Means come from the steady tail, not the 1e9 start-up rows.
    assert_relative_eq!(row[7].parse::<f64>().unwrap(), 100.0); // Thrust Net
    assert_relative_eq!(row[15].parse::<f64>().unwrap(), 50.0); // Torque
    // Blade channels expand to mean/max/min columns.
    assert_relative_eq!(row[12].parse::<f64>().unwrap(), 20.0); // mean blade thrust
    assert_relative_eq!(row[13].parse::<f64>().unwrap(), 30.0); // max
    assert_relative_eq!(row[14].parse::<f64>().unwrap(), 10.0); // min
    assert_relative_eq!(row[16].parse::<f64>().unwrap(), 10.0); // mean blade torque
    // Gearcase means are the constant channel values.
    assert_relative_eq!(row[24].parse::<f64>().unwrap(), 7.0);
    assert_relative_eq!(row[29].parse::<f64>().unwrap(), 12.0);
}

#[test]
fn coefficients_use_the_mesh_matched_calibration_ratio() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();
    let rows = read_table(&sweep.result_path()).unwrap();

    let kt_norm = |row: &Vec<String>| row[21].parse::<f64>().unwrap();

    // Expected KT at 3000 rpm before normalization.
    let rps: f64 = 50.0;
    let d_ft: f64 = 14.5 / 12.0;
    let kt = 100.0 / (rps.powi(2) * d_ft.powi(4) * 1.94);

    // First trim uses ratio 0.8, second trim ratio 0.5 — same rpm rows.
    assert_relative_eq!(kt_norm(&rows[1]), kt / 0.8, epsilon = 1e-12);
    assert_relative_eq!(kt_norm(&rows[3]), kt / 0.5, epsilon = 1e-12);

    // The counter resets with the outer speed, so the second speed's first
    // trim maps back to ratio 0.8 — not off the end of the table.
    assert_relative_eq!(kt_norm(&rows[5]), kt / 0.8, epsilon = 1e-12);
    assert_relative_eq!(kt_norm(&rows[7]), kt / 0.5, epsilon = 1e-12);
}

#[test]
fn warmup_applies_to_the_first_rpm_of_every_ladder() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();

    // 90 deg/step: warm-up (2 rev) = 8 steps, settled (1 rev) = 4 steps.
    // Four ladders of two rpms each.
    assert_eq!(engine.step_counts, vec![8, 4, 8, 4, 8, 4, 8, 4]);

    // Timestep tracks rpm: step_deg / (rpm/60 · 360).
    assert_relative_eq!(engine.timesteps[0], 90.0 / (3000.0 / 60.0 * 360.0));
    assert_relative_eq!(engine.timesteps[1], 90.0 / (3600.0 / 60.0 * 360.0));
}

#[test]
fn mesh_rebuilds_once_per_trim_not_once_per_point() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();

    // 2 speeds × 1 height × 2 trims = 4 rebuilds for 8 points.
    assert_eq!(engine.rebuilds, 4);
    // One checkpoint per point, unconditionally.
    assert_eq!(engine.checkpoints.len(), 8);
    assert_eq!(engine.checkpoints[0], "hub_v1_60mph_5deg_7in_3000rpm");
}

#[test]
fn exhaust_flow_ramps_cubically_with_rpm() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();

    let exhaust: Vec<f64> = engine
        .conditions
        .iter()
        .filter(|(name, _, _)| name == "Inlet_Exhaust")
        .map(|(_, _, v)| *v)
        .collect();
    assert_eq!(exhaust.len(), 8);
    assert_relative_eq!(exhaust[0], (3000.0_f64 / 3600.0).powi(3) * 0.4);
    assert_relative_eq!(exhaust[1], 0.4);

    // The free-stream wave and reference velocity follow the tow speed,
    // once per speed.
    let wave: Vec<f64> = engine
        .conditions
        .iter()
        .filter(|(name, var, _)| name == "FlatVofWave 1" && var == "Current")
        .map(|(_, _, v)| *v)
        .collect();
    assert_eq!(wave, vec![60.0, 40.0]);
}

#[test]
fn short_series_aborts_the_sweep() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();
    // Two data rows cannot fill a four-sample revolution window.
    engine.set_plot(
        "Prop",
        &format!(
            "Iteration,{}\n1,1,2,100,3,4,5,6,10,50,5\n2,1,2,100,3,4,5,6,30,50,15\n",
            PROP_CHANNELS.join(",")
        ),
    );

    let err = sweep.run(&mut engine).unwrap_err();
    assert!(!err.is_fatal(), "numeric error, fatal only via policy");
    // Abort-on-error: the first point died, nothing else ran.
    assert_eq!(engine.checkpoints.len(), 1);
    let rows = read_table(&sweep.result_path());
    assert!(rows.is_err() || rows.unwrap().len() <= 1);
}

#[test]
fn time_ramp_restarts_with_each_ladder() {
    let dir = tempdir().unwrap();
    let mut sweep = test_sweep(dir.path().to_path_buf());
    sweep.speeds_mph = vec![60.0];
    sweep.rpms = vec![3000.0, 3300.0, 3600.0];
    sweep.stopping = LadderStopping::TimeRamp {
        start_s: 25.0,
        increment_s: 5.0,
    };
    let mut engine = scripted_engine();

    sweep.run(&mut engine).unwrap();

    let targets: Vec<f64> = engine.time_targets.iter().map(|(_, t)| *t).collect();
    assert_eq!(targets, vec![25.0, 30.0, 35.0, 25.0, 30.0, 35.0]);
    assert!(engine
        .time_targets
        .iter()
        .all(|(name, _)| name == "Maximum Physical Time"));
    assert!(engine.step_counts.is_empty(), "no fixed-step runs in ramp mode");
}

#[test]
fn missing_session_object_is_fatal() {
    let dir = tempdir().unwrap();
    let sweep = test_sweep(dir.path().to_path_buf());
    let mut engine = scripted_engine();
    engine.mark_missing("Rotation");

    let err = sweep.run(&mut engine).unwrap_err();
    assert!(err.is_fatal());
    assert!(engine.checkpoints.is_empty());
}

//! Nondimensional propeller performance coefficients.
//!
//! Reduces the windowed thrust and torque means to the standard open-water
//! coefficient set:
//!
//! ```text
//! SHP     = rpm · 2π/60 · Q̄ / 550
//! J       = V / (n · D)
//! KT      = T̄ / (n² · D⁴ · ρ)        KT_norm = KT / areaRatio
//! KQ      = Q̄ / (n² · D⁵ · ρ)        KQ_norm = KQ / areaRatio
//! eta     = J/(2π) · KT_norm / KQ_norm
//! ```
//!
//! with n in rev/s, D in ft, V in ft/s, T̄ in lbf, Q̄ in lbf·ft. The
//! normalization divides by the per-mesh submerged area ratio: a surface-
//! piercing propeller only loads its wetted blade area, and that area is a
//! property of the generated mesh alone, so the ratio is looked up by mesh
//! index and shared by every run condition on that mesh.

use super::AggregateError;
use crate::sweep::MeshIndex;

/// Fresh water density (slug/ft³).
pub const WATER_DENSITY_SLUG_FT3: f64 = 1.94;
/// Miles per hour to feet per second.
pub const MPH_TO_FT_PER_S: f64 = 1.467;
/// Inches per foot.
pub const IN_PER_FT: f64 = 12.0;

/// One horsepower in ft·lbf/s.
const HORSEPOWER_FT_LBF_PER_S: f64 = 550.0;

/// Per-mesh submerged area ratios, indexed by [`MeshIndex`].
#[derive(Clone, Debug)]
pub struct Calibration {
    ratios: Vec<f64>,
}

impl Calibration {
    /// Calibration table with one ratio per expected mesh, in mesh order.
    pub fn new(ratios: Vec<f64>) -> Self {
        Self { ratios }
    }

    /// Ratio for the given mesh.
    ///
    /// # Errors
    /// - [`AggregateError::MissingCalibration`] if the table has no entry
    /// - [`AggregateError::BadCalibration`] if the entry cannot divide
    pub fn ratio(&self, mesh: MeshIndex) -> Result<f64, AggregateError> {
        let index = mesh.as_usize();
        let ratio = *self
            .ratios
            .get(index)
            .ok_or(AggregateError::MissingCalibration(index))?;
        if ratio.is_nan() || ratio <= 0.0 {
            return Err(AggregateError::BadCalibration { index, ratio });
        }
        Ok(ratio)
    }
}

/// Derived coefficient set for one sweep point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropellerCoefficients {
    /// Shaft horsepower.
    pub shp: f64,
    /// Advance ratio J.
    pub advance_ratio: f64,
    /// Thrust coefficient before area normalization.
    pub kt: f64,
    /// Thrust coefficient normalized by submerged area ratio.
    pub kt_norm: f64,
    /// Torque coefficient before area normalization.
    pub kq: f64,
    /// Torque coefficient normalized by submerged area ratio.
    pub kq_norm: f64,
    /// Open-water efficiency.
    pub efficiency: f64,
}

/// Derive the coefficient set from windowed means.
///
/// `area_ratio` comes from [`Calibration::ratio`] and is already validated
/// positive.
pub fn propeller_coefficients(
    rpm: f64,
    speed_mph: f64,
    diameter_in: f64,
    mean_thrust_lbf: f64,
    mean_torque_lbf_ft: f64,
    area_ratio: f64,
) -> PropellerCoefficients {
    let rps = rpm / 60.0;
    let diameter_ft = diameter_in / IN_PER_FT;
    let speed_fts = speed_mph * MPH_TO_FT_PER_S;

    let shp = rpm * 2.0 * std::f64::consts::PI / 60.0 * mean_torque_lbf_ft
        / HORSEPOWER_FT_LBF_PER_S;
    let advance_ratio = speed_fts / (rps * diameter_ft);

    let kt = mean_thrust_lbf / (rps.powi(2) * diameter_ft.powi(4) * WATER_DENSITY_SLUG_FT3);
    let kq = mean_torque_lbf_ft / (rps.powi(2) * diameter_ft.powi(5) * WATER_DENSITY_SLUG_FT3);
    let kt_norm = kt / area_ratio;
    let kq_norm = kq / area_ratio;

    let efficiency = advance_ratio / (2.0 * std::f64::consts::PI) * kt_norm / kq_norm;

    PropellerCoefficients {
        shp,
        advance_ratio,
        kt,
        kt_norm,
        kq,
        kq_norm,
        efficiency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn coefficients_match_the_defining_formulas() {
        let rpm = 3000.0;
        let speed_mph = 60.0;
        let diameter_in = 14.5;
        let thrust = 100.0;
        let torque = 50.0;

        let c = propeller_coefficients(rpm, speed_mph, diameter_in, thrust, torque, 1.0);

        let rps = rpm / 60.0;
        let d_ft = diameter_in / 12.0;
        assert_relative_eq!(c.shp, rpm * 2.0 * PI / 60.0 * torque / 550.0);
        assert_relative_eq!(c.advance_ratio, speed_mph * 1.467 / (rps * d_ft));
        assert_relative_eq!(c.kt, thrust / (rps * rps * d_ft.powi(4) * 1.94));
        assert_relative_eq!(c.kq, torque / (rps * rps * d_ft.powi(5) * 1.94));
        assert_relative_eq!(c.kt_norm, c.kt);
        assert_relative_eq!(c.kq_norm, c.kq);
        assert_relative_eq!(
            c.efficiency,
            c.advance_ratio / (2.0 * PI) * c.kt_norm / c.kq_norm
        );

        // Spot values, independently computed.
        assert_relative_eq!(c.shp, 28.559933214452666, epsilon = 1e-9);
        assert_relative_eq!(c.advance_ratio, 1.4568827586206897, epsilon = 1e-9);
    }

    #[test]
    fn normalization_divides_by_the_area_ratio() {
        let full = propeller_coefficients(3000.0, 60.0, 14.5, 100.0, 50.0, 1.0);
        let half = propeller_coefficients(3000.0, 60.0, 14.5, 100.0, 50.0, 0.5);

        assert_relative_eq!(half.kt, full.kt);
        assert_relative_eq!(half.kq, full.kq);
        assert_relative_eq!(half.kt_norm, 2.0 * full.kt_norm);
        assert_relative_eq!(half.kq_norm, 2.0 * full.kq_norm);
        // eta is a ratio of normalized coefficients, so the area cancels.
        assert_relative_eq!(half.efficiency, full.efficiency);
    }

    #[test]
    fn calibration_lookup_guards_the_divisor() {
        let cal = Calibration::new(vec![0.8856, 0.7886, 0.0]);

        assert_relative_eq!(cal.ratio(MeshIndex::new(1)).unwrap(), 0.7886);
        assert!(matches!(
            cal.ratio(MeshIndex::new(2)),
            Err(AggregateError::BadCalibration { index: 2, .. })
        ));
        assert!(matches!(
            cal.ratio(MeshIndex::new(3)),
            Err(AggregateError::MissingCalibration(3))
        ));
    }
}

//! Coordinate-frame composition from sweep angles and offsets.
//!
//! Pure functions: given sweep angles (degrees) and geometric offsets
//! (inches), compute the origins and basis vectors of the chained local
//! coordinate systems the engine session uses to pose the hull and the
//! propeller. No side effects; the sweep driver applies the results through
//! the engine port.
//!
//! Two chains exist, and their parent→child order is part of the pose:
//!
//! - attitude chain: lab → `sink` → `yaw` → `roll_trim`
//! - propeller chain: lab → `Trim_Center` → `GC_Center` → `Prop_Center`
//!
//! Basis vectors are intended to be unit length and mutually orthogonal;
//! the engine completes the unset axes, and this module does not verify the
//! invariant (asserted in tests only).

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Conventional engine names for the attitude chain.
pub const SINK_FRAME: &str = "sink";
/// Yaw frame, child of [`SINK_FRAME`].
pub const YAW_FRAME: &str = "yaw";
/// Roll/trim frame, child of [`YAW_FRAME`].
pub const ROLL_TRIM_FRAME: &str = "roll_trim";

/// Conventional engine names for the propeller chain.
pub const TRIM_CENTER_FRAME: &str = "Trim_Center";
/// Gearcase center, child of [`TRIM_CENTER_FRAME`].
pub const GC_CENTER_FRAME: &str = "GC_Center";
/// Propeller center, child of [`GC_CENTER_FRAME`].
pub const PROP_CENTER_FRAME: &str = "Prop_Center";

// =============================================================================
// Vec3
// =============================================================================

/// A 3-vector in frame coordinates (inches for origins and translations,
/// dimensionless for basis vectors).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    /// x component (longitudinal, positive forward).
    pub x: f64,
    /// y component (transverse).
    pub y: f64,
    /// z component (vertical).
    pub z: f64,
}

impl Vec3 {
    /// Zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Lab x axis.
    pub const UNIT_X: Self = Self::new(1.0, 0.0, 0.0);
    /// Lab y axis.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0, 0.0);
    /// Lab z axis.
    pub const UNIT_Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Create a vector from components.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Euclidean norm.
    #[inline]
    pub fn norm(self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, c: f64) -> Self {
        Self::new(self.x * c, self.y * c, self.z * c)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

// =============================================================================
// CoordinateFrame
// =============================================================================

/// A local coordinate system: origin plus the two leading basis vectors.
///
/// The third axis is implied orthogonal (see [`CoordinateFrame::basis2`]).
/// Frames form a tree rooted at the lab frame; each non-root frame names
/// its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinateFrame {
    /// Origin, in the parent frame's coordinates.
    pub origin: Vec3,
    /// First basis vector.
    pub basis0: Vec3,
    /// Second basis vector.
    pub basis1: Vec3,
    /// Parent frame name; `None` for frames hanging off the lab frame.
    pub parent: Option<String>,
}

impl CoordinateFrame {
    /// An untransformed frame aligned with its parent's axes.
    pub fn aligned() -> Self {
        Self {
            origin: Vec3::ZERO,
            basis0: Vec3::UNIT_X,
            basis1: Vec3::UNIT_Y,
            parent: None,
        }
    }

    /// An untransformed frame that is a child of `parent`.
    pub fn child_of(parent: &str) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::aligned()
        }
    }

    /// Set the origin.
    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Set the first basis vector.
    pub fn with_basis0(mut self, basis0: Vec3) -> Self {
        self.basis0 = basis0;
        self
    }

    /// Set the second basis vector.
    pub fn with_basis1(mut self, basis1: Vec3) -> Self {
        self.basis1 = basis1;
        self
    }

    /// The implied third axis, `basis0 × basis1`.
    pub fn basis2(&self) -> Vec3 {
        self.basis0.cross(self.basis1)
    }

    /// Whether the two stored bases are unit length and mutually orthogonal
    /// within `tol`.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        (self.basis0.norm() - 1.0).abs() < tol
            && (self.basis1.norm() - 1.0).abs() < tol
            && self.basis0.dot(self.basis1).abs() < tol
    }
}

// =============================================================================
// Attitude chain
// =============================================================================

/// Hull attitude for one sweep point: vertical sink plus the three
/// orientation angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attitude {
    /// Sink below the undisturbed waterline (in).
    pub sink_in: f64,
    /// Roll angle (deg).
    pub roll_deg: f64,
    /// Pitch angle (deg), positive bow up.
    pub pitch_deg: f64,
    /// Yaw angle (deg).
    pub yaw_deg: f64,
}

/// The attitude frame chain, in parent→child order.
#[derive(Clone, Debug, PartialEq)]
pub struct AttitudeFrames {
    /// `sink`: translated down the lab z axis.
    pub sink: CoordinateFrame,
    /// `yaw`: rotated about z, child of `sink`.
    pub yaw: CoordinateFrame,
    /// `roll_trim`: rolled about x then pitched, child of `yaw`.
    pub roll_trim: CoordinateFrame,
}

/// Compute the attitude frame chain for one sweep point.
///
/// - sink origin = (0, 0, sink)
/// - yaw basis0 = (cos ψ, sin ψ, 0)
/// - roll_trim basis1 = (0, cos φ, sin φ), basis0 = (cos θ, 0, sin(−θ))
pub fn attitude_frames(attitude: &Attitude) -> AttitudeFrames {
    let roll = attitude.roll_deg.to_radians();
    let pitch = attitude.pitch_deg.to_radians();
    let yaw = attitude.yaw_deg.to_radians();

    let sink = CoordinateFrame::aligned().with_origin(sink_translation(attitude.sink_in));

    let yaw_frame = CoordinateFrame::child_of(SINK_FRAME)
        .with_basis0(Vec3::new(yaw.cos(), yaw.sin(), 0.0));

    let roll_trim = CoordinateFrame::child_of(YAW_FRAME)
        .with_basis1(Vec3::new(0.0, roll.cos(), roll.sin()))
        .with_basis0(Vec3::new(pitch.cos(), 0.0, (-pitch).sin()));

    AttitudeFrames {
        sink,
        yaw: yaw_frame,
        roll_trim,
    }
}

/// Mesh translation that sinks the hull: (0, 0, +sink).
pub fn sink_translation(sink_in: f64) -> Vec3 {
    Vec3::new(0.0, 0.0, sink_in)
}

// =============================================================================
// Propeller chain
// =============================================================================

/// Fixed geometric offsets of the drive, measured on the level-trim hull.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimGeometry {
    /// x distance from the trim point to the gearcase center (in).
    pub trim_point_x_in: f64,
    /// z distance from the trim point to the gearcase center (in).
    pub trim_point_z_in: f64,
    /// x distance from the gearcase center to the propeller center (in).
    pub prop_x_in: f64,
}

/// The propeller frame chain, in parent→child order.
#[derive(Clone, Debug, PartialEq)]
pub struct PropellerFrames {
    /// `Trim_Center`: trim pivot, child of the lab frame.
    pub trim_center: CoordinateFrame,
    /// `GC_Center`: gearcase center, child of `Trim_Center`.
    pub gc_center: CoordinateFrame,
    /// `Prop_Center`: propeller center, child of `GC_Center`.
    pub prop_center: CoordinateFrame,
}

/// Compute the propeller frame chain for one (height, trim) pair.
///
/// - trim center origin = (−trimPointX, 0, trimPointZ − height),
///   basis0 = (cos τ, 0, sin τ)
/// - gc center origin = (trimPointX, 0, −trimPointZ), relative to the trim
///   center
/// - prop center origin = (propX, 0, 0), relative to the gc center
pub fn propeller_frames(height_in: f64, trim_deg: f64, geom: &TrimGeometry) -> PropellerFrames {
    let trim = trim_deg.to_radians();

    let trim_center = CoordinateFrame::aligned()
        .with_origin(Vec3::new(
            -geom.trim_point_x_in,
            0.0,
            geom.trim_point_z_in - height_in,
        ))
        .with_basis0(Vec3::new(trim.cos(), 0.0, trim.sin()));

    let gc_center = CoordinateFrame::child_of(TRIM_CENTER_FRAME).with_origin(Vec3::new(
        geom.trim_point_x_in,
        0.0,
        -geom.trim_point_z_in,
    ));

    let prop_center =
        CoordinateFrame::child_of(GC_CENTER_FRAME).with_origin(Vec3::new(geom.prop_x_in, 0.0, 0.0));

    PropellerFrames {
        trim_center,
        gc_center,
        prop_center,
    }
}

/// Mesh translation that heaves the drive down: (0, 0, −height).
pub fn heave_translation(height_in: f64) -> Vec3 {
    Vec3::new(0.0, 0.0, -height_in)
}

/// Mesh translation that keeps the outer refinement zone following the
/// trimmed drive: (trimPointZ·sin τ, 0, (trimPointX + propX)·sin τ).
pub fn refinement_translation(trim_deg: f64, geom: &TrimGeometry) -> Vec3 {
    let s = trim_deg.to_radians().sin();
    Vec3::new(
        geom.trim_point_z_in * s,
        0.0,
        (geom.trim_point_x_in + geom.prop_x_in) * s,
    )
}

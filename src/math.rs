//! Linear algebra primitives using glam plus the scalar helpers shared by
//! tracking, idle animation and the arm solver.

pub use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

/// Small epsilon value for floating-point comparisons
pub const EPSILON: f32 = 1e-6;

/// Half-sine bell over `t` in [0, 1]: 0 at the ends, 1 at the midpoint.
#[inline]
pub fn bell(t: f32) -> f32 {
    (t.clamp(0.0, 1.0) * std::f32::consts::PI).sin().max(0.0)
}

/// Angle in radians between two rotations.
///
/// Uses atan2 on the relative rotation instead of acos so that nearly equal
/// rotations keep full precision.
pub fn angle_between(a: Quat, b: Quat) -> f32 {
    let rel = a.inverse() * b;
    2.0 * rel.xyz().length().atan2(rel.w.abs())
}

/// Remove the component of `v` along unit `axis`.
#[inline]
pub fn project_off_axis(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

/// Signed angle from `from` to `to` about unit `axis`.
#[inline]
pub fn signed_angle_about(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    axis.dot(from.cross(to)).atan2(from.dot(to))
}

//! Two-bone arm aiming (shoulder -> elbow -> wrist).
//!
//! The upper arm swings from its rest direction onto the shoulder->elbow
//! direction, then twists about that direction so its bind X axis faces the
//! pole. The lower arm swings onto elbow->wrist. Both targets are composed
//! with the bind rotation and approached with a fixed slerp per call.
//!
//! Nothing in the tracking loop calls this; it is compiled only with the
//! `arm-ik` feature.

use crate::bone::{BindCache, PoseState};
use crate::math::{Quat, Vec3, project_off_axis, signed_angle_about};
use crate::skeleton::{NodeId, Skeleton};

/// Twist about the upper arm is limited to this many radians either way
pub const MAX_TWIST: f32 = std::f32::consts::PI * 0.8;

pub const UPPER_BLEND: f32 = 0.35;
pub const LOWER_BLEND: f32 = 0.4;

/// Joint positions in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmTarget {
    pub shoulder: Vec3,
    pub elbow: Vec3,
    pub wrist: Vec3,
    /// Direction the elbow should bend toward
    pub pole: Option<Vec3>,
}

/// Target local rotations for both arm bones
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmRotations {
    pub upper: Quat,
    pub lower: Option<Quat>,
}

/// Compute the local rotations that aim the arm at `target` under the current pose.
///
/// Returns None if either bone is a root or the shoulder and elbow coincide.
/// `lower` is None when the elbow and wrist coincide.
pub fn solve_arm(
    skeleton: &Skeleton,
    pose: &PoseState,
    cache: &BindCache,
    upper: NodeId,
    lower: NodeId,
    target: &ArmTarget,
) -> Option<ArmRotations> {
    skeleton.node(upper).parent?;
    skeleton.node(lower).parent?;

    let s = pose.to_parent_space(skeleton, upper, target.shoulder);
    let e = pose.to_parent_space(skeleton, upper, target.elbow);
    let dir_upper = (e - s).normalize_or_zero();
    if dir_upper == Vec3::ZERO {
        return None;
    }

    let bind_u = cache.get(upper);
    let rest_u = bind_u.and_then(|b| b.rest_dir).unwrap_or(Vec3::Y);
    let swing = Quat::from_rotation_arc(rest_u, dir_upper);

    // Twist the swung bind X axis toward the pole, both flattened onto the
    // plane perpendicular to the bone
    let rest_perp = bind_u.and_then(|b| b.rest_perp).unwrap_or(Vec3::X);
    let a = project_off_axis(swing * rest_perp, dir_upper).normalize_or_zero();
    let b = target
        .pole
        .map(|pole| {
            let local = pose.parent_world_rotation(skeleton, upper).inverse() * pole;
            project_off_axis(local.normalize_or_zero(), dir_upper).normalize_or_zero()
        })
        .unwrap_or(a);
    let twist = signed_angle_about(a, b, dir_upper).clamp(-MAX_TWIST, MAX_TWIST);

    let bind_rotation_u = bind_u.map_or(Quat::IDENTITY, |b| b.rotation);
    let upper_target = Quat::from_axis_angle(dir_upper, twist) * swing * bind_rotation_u;

    let e = pose.to_parent_space(skeleton, lower, target.elbow);
    let w = pose.to_parent_space(skeleton, lower, target.wrist);
    let dir_lower = (w - e).normalize_or_zero();
    let lower_target = (dir_lower != Vec3::ZERO).then(|| {
        let bind_l = cache.get(lower);
        let rest_l = bind_l.and_then(|b| b.rest_dir).unwrap_or(Vec3::Y);
        Quat::from_rotation_arc(rest_l, dir_lower) * bind_l.map_or(Quat::IDENTITY, |b| b.rotation)
    });

    Some(ArmRotations {
        upper: upper_target.normalize(),
        lower: lower_target.map(Quat::normalize),
    })
}

/// Move both arm bones part of the way toward [`solve_arm`]'s result.
///
/// Returns false, leaving the pose untouched, when no solution exists.
pub fn aim_two_bone_arm(
    skeleton: &Skeleton,
    pose: &mut PoseState,
    cache: &BindCache,
    upper: NodeId,
    lower: NodeId,
    target: &ArmTarget,
) -> bool {
    let Some(rotations) = solve_arm(skeleton, pose, cache, upper, lower, target) else {
        return false;
    };

    pose.set_rotation(upper, pose.rotation(upper).slerp(rotations.upper, UPPER_BLEND));
    if let Some(lower_target) = rotations.lower {
        pose.set_rotation(lower, pose.rotation(lower).slerp(lower_target, LOWER_BLEND));
    }
    true
}

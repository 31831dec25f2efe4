//! Orientation smoothing for the tracked head bone.
//!
//! Each accepted estimate moves the bone a fraction of the way toward the
//! target with a quaternion slerp. The fraction is either fixed per update
//! (frame-rate dependent, as shipped) or derived from a time constant.

use serde::{Deserialize, Serialize};

use crate::math::Quat;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Constant blend factor per update, in (0, 1]
    FixedBlend { alpha: f32 },
    /// Exponential decay with time constant `tau` seconds
    TimeConstant { tau: f32 },
}

impl Default for SmoothingMode {
    fn default() -> Self {
        SmoothingMode::FixedBlend { alpha: 0.15 }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub mode: SmoothingMode,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationSmoother {
    mode: SmoothingMode,
}

impl OrientationSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        Self { mode: config.mode }
    }

    /// Blend factor for an update `dt` seconds after the previous one.
    pub fn blend_factor(&self, dt: f32) -> f32 {
        match self.mode {
            SmoothingMode::FixedBlend { alpha } => alpha.clamp(0.0, 1.0),
            SmoothingMode::TimeConstant { tau } => {
                if tau <= 0.0 {
                    1.0
                } else {
                    1.0 - (-dt.max(0.0) / tau).exp()
                }
            }
        }
    }

    /// Move `current` toward `target`; the result is always unit length.
    pub fn step(&self, current: Quat, target: Quat, dt: f32) -> Quat {
        let current = current.normalize();
        let target = target.normalize();
        current.slerp(target, self.blend_factor(dt)).normalize()
    }
}

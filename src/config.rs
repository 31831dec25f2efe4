//! Puppet configuration, passed in from the host page as JSON.

use serde::{Deserialize, Serialize};

use crate::animation::IdleConfig;
use crate::camera::FramingConfig;
use crate::error::{Error, Result};
use crate::head_pose::HeadPoseConfig;
use crate::smoothing::{SmoothingConfig, SmoothingMode};

/// Every tunable of the puppet. Missing fields take the shipped defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PuppetConfig {
    pub head_pose: HeadPoseConfig,
    pub smoothing: SmoothingConfig,
    pub idle: IdleConfig,
    pub framing: FramingConfig,
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}

fn positive(name: &str, v: f32) -> Result<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{} must be positive, got {}", name, v)))
    }
}

fn non_negative(name: &str, v: f32) -> Result<()> {
    if v >= 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(invalid(format!("{} must be non-negative, got {}", name, v)))
    }
}

fn unit_interval(name: &str, v: f32) -> Result<()> {
    if v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be in (0, 1], got {}", name, v)))
    }
}

impl PuppetConfig {
    /// Parse and validate a JSON config. An empty object gives the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let h = &self.head_pose;
        non_negative("head_pose.pitch_gain", h.pitch_gain)?;
        non_negative("head_pose.yaw_gain", h.yaw_gain)?;
        non_negative("head_pose.roll_gain", h.roll_gain)?;
        non_negative("head_pose.depth_gain", h.depth_gain)?;
        // A limit of zero pins the axis; negative would invert the clamp range
        non_negative("head_pose.pitch_limit", h.pitch_limit)?;
        non_negative("head_pose.yaw_limit", h.yaw_limit)?;
        non_negative("head_pose.roll_limit", h.roll_limit)?;
        positive("head_pose.min_eye_distance", h.min_eye_distance)?;

        match self.smoothing.mode {
            SmoothingMode::FixedBlend { alpha } => unit_interval("smoothing.alpha", alpha)?,
            SmoothingMode::TimeConstant { tau } => positive("smoothing.tau", tau)?,
        }

        let i = &self.idle;
        positive("idle.blink_duration", i.blink_duration)?;
        positive("idle.blink_interval_min", i.blink_interval_min)?;
        non_negative("idle.blink_interval_spread", i.blink_interval_spread)?;
        positive("idle.saccade_interval_min", i.saccade_interval_min)?;
        non_negative("idle.saccade_interval_spread", i.saccade_interval_spread)?;
        non_negative("idle.saccade_yaw_range", i.saccade_yaw_range)?;
        non_negative("idle.saccade_pitch_range", i.saccade_pitch_range)?;
        unit_interval("idle.saccade_ease", i.saccade_ease)?;
        non_negative("idle.breath_rate", i.breath_rate)?;
        if !(0.0..=1.0).contains(&i.min_eye_scale) {
            return Err(invalid(format!(
                "idle.min_eye_scale must be between 0 and 1, got {}",
                i.min_eye_scale
            )));
        }

        let f = &self.framing;
        if !(f.fov_y_deg > 0.0 && f.fov_y_deg < 180.0) {
            return Err(invalid(format!(
                "framing.fov_y_deg must be in (0, 180), got {}",
                f.fov_y_deg
            )));
        }
        positive("framing.target_height", f.target_height)?;
        positive("framing.head_height", f.head_height)?;
        positive("framing.body_pad", f.body_pad)?;
        positive("framing.head_pad", f.head_pad)?;
        positive("framing.near", f.near)?;
        if f.far <= f.near {
            return Err(invalid(format!(
                "framing.far ({}) must exceed framing.near ({})",
                f.far, f.near
            )));
        }

        Ok(())
    }
}

//! Lightweight head pose estimation from face-mesh landmarks.
//!
//! Roll comes from the tilt of the eye line, yaw from the horizontal nose
//! offset against the eye midpoint. Pitch has two variants:
//!
//! - [`PitchMode::EyeLine`]: vertical nose offset against the eye midpoint.
//! - [`PitchMode::DepthCalibrated`]: forehead/chin depth difference, with the
//!   first frame taken as neutral and subtracted from every later frame.
//!
//! Every axis is scaled by an empirical gain and clamped so the head bone
//! never reaches unnatural extremes.

use serde::{Deserialize, Serialize};

use crate::landmark::{FaceLandmarks, index};
use crate::math::{EulerRot, Quat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchMode {
    EyeLine,
    #[default]
    DepthCalibrated,
}

/// Mirroring applied before the gains.
///
/// `Selfie` negates roll only: with a mirrored camera feed, tilting the head
/// toward the right shoulder tilts the avatar toward screen-right, and turning
/// right turns the avatar toward screen-right as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirror {
    #[default]
    Selfie,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseConfig {
    pub pitch_mode: PitchMode,
    pub mirror: Mirror,
    pub pitch_gain: f32,
    pub yaw_gain: f32,
    pub roll_gain: f32,
    /// Scale applied to the raw forehead/chin depth difference
    pub depth_gain: f32,
    pub pitch_limit: f32,
    pub yaw_limit: f32,
    pub roll_limit: f32,
    /// Floor for the inter-eye distance (normalized units)
    pub min_eye_distance: f32,
}

impl Default for HeadPoseConfig {
    fn default() -> Self {
        Self {
            pitch_mode: PitchMode::DepthCalibrated,
            mirror: Mirror::Selfie,
            pitch_gain: 2.0,
            yaw_gain: 2.4,
            roll_gain: 1.2,
            depth_gain: 5.0,
            pitch_limit: 0.8,
            yaw_limit: 1.0,
            roll_limit: 0.7,
            min_eye_distance: 1e-6,
        }
    }
}

impl HeadPoseConfig {
    /// 2D-only variant with the wider yaw range it shipped with.
    pub fn eye_line() -> Self {
        Self {
            pitch_mode: PitchMode::EyeLine,
            yaw_limit: 1.2,
            ..Self::default()
        }
    }
}

/// Head rotation estimate in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadEuler {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl HeadEuler {
    /// Yaw, then pitch, then roll.
    pub fn to_quat(self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// Stateful estimator; the only state is the neutral pitch captured on the
/// first depth-calibrated frame.
#[derive(Debug, Clone, Default)]
pub struct HeadPoseEstimator {
    config: HeadPoseConfig,
    neutral_pitch: Option<f32>,
}

impl HeadPoseEstimator {
    pub fn new(config: HeadPoseConfig) -> Self {
        Self {
            config,
            neutral_pitch: None,
        }
    }

    pub fn config(&self) -> &HeadPoseConfig {
        &self.config
    }

    pub fn is_calibrated(&self) -> bool {
        self.neutral_pitch.is_some()
    }

    /// Forget the neutral pitch; the next frame becomes the new neutral.
    pub fn reset_calibration(&mut self) {
        self.neutral_pitch = None;
    }

    /// Estimate the head rotation for one face.
    ///
    /// Returns None when a required landmark is missing or non-finite, in
    /// which case the caller leaves the bone untouched.
    pub fn estimate(&mut self, face: &FaceLandmarks<'_>) -> Option<HeadEuler> {
        let cfg = &self.config;

        let left = face.get(index::LEFT_EYE_OUTER)?;
        let right = face.get(index::RIGHT_EYE_OUTER)?;
        let nose = face.get(index::NOSE_TIP)?;
        if !(left.is_finite() && right.is_finite() && nose.is_finite()) {
            return None;
        }

        let vx = right.x - left.x;
        let vy = right.y - left.y;
        let eye_dist = vx.hypot(vy).max(cfg.min_eye_distance);
        let mid_x = (left.x + right.x) * 0.5;
        let mid_y = (left.y + right.y) * 0.5;

        let mut roll = vy.atan2(vx);
        let yaw = (nose.x - mid_x).atan2(eye_dist);

        let pitch = match cfg.pitch_mode {
            PitchMode::EyeLine => (nose.y - mid_y).atan2(eye_dist),
            PitchMode::DepthCalibrated => {
                let forehead = face.get(index::FOREHEAD)?;
                let chin = face.get(index::CHIN)?;
                // Chin closer than forehead when tilting forward
                let raw = (forehead.z - chin.z) * cfg.depth_gain;
                if !raw.is_finite() {
                    return None;
                }
                let neutral = *self.neutral_pitch.get_or_insert(raw);
                raw - neutral
            }
        };

        if cfg.mirror == Mirror::Selfie {
            roll = -roll;
        }

        let estimate = HeadEuler {
            pitch: (-pitch * cfg.pitch_gain).clamp(-cfg.pitch_limit, cfg.pitch_limit),
            yaw: (yaw * cfg.yaw_gain).clamp(-cfg.yaw_limit, cfg.yaw_limit),
            roll: (-roll * cfg.roll_gain).clamp(-cfg.roll_limit, cfg.roll_limit),
        };

        estimate.is_finite().then_some(estimate)
    }
}

//! Procedural idle motion: breathing sway, eye saccades and blinking.
//!
//! All three run every tick regardless of tracking. Each one writes to its
//! own bones or morph channels and is skipped when the rig lacks them.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::bone::{BoneRole, PoseState};
use crate::math::{EulerRot, Quat, Vec2, Vec3, bell};
use crate::rig::Rig;
use crate::skeleton::{NodeId, Skeleton};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Breathing angular frequency (rad/s)
    pub breath_rate: f32,
    /// Spine pitch amplitude (rad)
    pub spine_breath: f32,
    /// Neck pitch amplitude (rad), applied inverted
    pub neck_breath: f32,
    /// Shortest wait before the next gaze target (s)
    pub saccade_interval_min: f32,
    /// Random extra wait on top of the minimum (s)
    pub saccade_interval_spread: f32,
    /// Full width of the yaw target range (rad)
    pub saccade_yaw_range: f32,
    /// Full width of the pitch target range (rad)
    pub saccade_pitch_range: f32,
    /// Fraction of the remaining gaze distance covered each tick
    pub saccade_ease: f32,
    pub blink_interval_min: f32,
    pub blink_interval_spread: f32,
    pub blink_duration: f32,
    /// Vertical eye scale at full closure when no blink morphs exist
    pub min_eye_scale: f32,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            breath_rate: 2.0,
            spine_breath: 0.005,
            neck_breath: 0.002,
            saccade_interval_min: 0.2,
            saccade_interval_spread: 2.0,
            saccade_yaw_range: 0.15,
            saccade_pitch_range: 0.1,
            saccade_ease: 0.1,
            blink_interval_min: 2.0,
            blink_interval_spread: 4.0,
            blink_duration: 0.15,
            min_eye_scale: 0.01,
        }
    }
}

/// Blink closure at `elapsed` seconds into a blink lasting `duration`.
///
/// Follows a half-sine: 0 at the start, 1 halfway, 0 at the end.
#[inline]
pub fn blink_value(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    bell(elapsed / duration)
}

/// Pitch offsets (spine, neck) at `time`.
pub fn breathing(config: &IdleConfig, time: f32) -> (f32, f32) {
    let phase = (time * config.breath_rate).sin();
    (phase * config.spine_breath, -phase * config.neck_breath)
}

/// Gaze as (yaw, pitch) in `x`, `y`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SaccadeState {
    pub current: Vec2,
    pub target: Vec2,
    pub next_retarget: f32,
}

impl SaccadeState {
    /// Advance to `time` and return the eased gaze.
    pub fn update<R: Rng + ?Sized>(&mut self, config: &IdleConfig, time: f32, rng: &mut R) -> Vec2 {
        if time > self.next_retarget {
            self.target = Vec2::new(
                (rng.random::<f32>() - 0.5) * config.saccade_yaw_range,
                (rng.random::<f32>() - 0.5) * config.saccade_pitch_range,
            );
            self.next_retarget = time
                + config.saccade_interval_min
                + rng.random::<f32>() * config.saccade_interval_spread;
        }
        self.current += (self.target - self.current) * config.saccade_ease;
        self.current
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlinkState {
    pub blinking: bool,
    pub started_at: f32,
    pub next_blink: f32,
}

impl BlinkState {
    /// Advance to `time` and return the closure amount in [0, 1].
    pub fn update<R: Rng + ?Sized>(&mut self, config: &IdleConfig, time: f32, rng: &mut R) -> f32 {
        if !self.blinking && time > self.next_blink {
            self.blinking = true;
            self.started_at = time;
        }
        if !self.blinking {
            return 0.0;
        }

        let elapsed = time - self.started_at;
        if elapsed >= config.blink_duration {
            self.blinking = false;
            self.next_blink = time
                + config.blink_interval_min
                + rng.random::<f32>() * config.blink_interval_spread;
            return 0.0;
        }
        blink_value(elapsed, config.blink_duration)
    }
}

/// Drives the idle layer for one avatar.
#[derive(Debug, Clone, Default)]
pub struct IdleAnimator {
    config: IdleConfig,
    pub saccade: SaccadeState,
    pub blink: BlinkState,
}

impl IdleAnimator {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config,
            saccade: SaccadeState::default(),
            blink: BlinkState::default(),
        }
    }

    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    pub fn update<R: Rng + ?Sized>(
        &mut self,
        time: f32,
        skeleton: &Skeleton,
        rig: &Rig,
        pose: &mut PoseState,
        rng: &mut R,
    ) {
        self.apply_breathing(time, skeleton, rig, pose);

        if let Some((left, right)) = rig.eyes() {
            let gaze = self.saccade.update(&self.config, time, rng);
            let offset = Quat::from_euler(EulerRot::YXZ, gaze.x, gaze.y, 0.0);
            for eye in [left, right] {
                pose.set_rotation(eye, skeleton.node(eye).rotation * offset);
            }
        }

        let closure = self.blink.update(&self.config, time, rng);
        if let Some(morphs) = &rig.blink {
            for &channel in &morphs.channels {
                pose.set_morph_weight(morphs.mesh, channel, closure);
            }
        } else if let Some((left, right)) = rig.eyes() {
            let squash = 1.0 - closure * (1.0 - self.config.min_eye_scale);
            for eye in [left, right] {
                let bind = skeleton.node(eye).scale;
                pose.set_scale(eye, Vec3::new(bind.x, bind.y * squash, bind.z));
            }
        }
    }

    fn apply_breathing(&self, time: f32, skeleton: &Skeleton, rig: &Rig, pose: &mut PoseState) {
        let (spine, neck) = breathing(&self.config, time);
        let sway = |pose: &mut PoseState, id: NodeId, angle: f32| {
            pose.set_rotation(id, skeleton.node(id).rotation * Quat::from_rotation_x(angle));
        };

        // Neck counter-sway only balances a swaying spine
        let Some(spine_id) = rig.get(BoneRole::Spine) else {
            return;
        };
        sway(pose, spine_id, spine);

        // Head tracking owns the neck when it stands in for the head
        if let Some(id) = rig.get(BoneRole::Neck).filter(|&id| rig.head() != Some(id)) {
            sway(pose, id, neck);
        }
    }
}

//! Session state with the context passing pattern.
//!
//! One [`AvatarSession`] owns everything a puppet mutates: the loaded avatar
//! and its pose, the estimator calibration, idle timers, the RNG and the UI
//! state. Nothing lives in globals, so independent sessions can coexist and
//! tests drive a session deterministically with a seeded RNG.
//!
//! Inference and rendering are decoupled through a [`PoseSlot`]: the face
//! callback overwrites the latest estimate, the render tick takes it.

use std::cell::Cell;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::animation::IdleAnimator;
use crate::bone::{BindCache, BoneRole, PoseSnapshot, PoseState};
use crate::camera::{Aabb, CameraFraming, Placement, Viewport, frame_camera, place_avatar};
use crate::config::PuppetConfig;
use crate::error::{Error, Result};
use crate::head_pose::{HeadEuler, HeadPoseEstimator};
use crate::landmark::{FaceLandmarks, Landmark};
use crate::math::Vec3;
use crate::rig::Rig;
use crate::skeleton::{NodeId, Skeleton, SkeletonDesc};
use crate::smoothing::OrientationSmoother;
use crate::status::{InstructionPanel, StartControl, TrackingStatus};

/// Step interval assumed for the first applied estimate
const DEFAULT_FRAME_DT: f32 = 1.0 / 60.0;

/// Single-writer, single-reader slot holding the most recent head estimate.
///
/// A newer estimate overwrites an unconsumed one; stale results are never
/// queued.
#[derive(Debug, Default)]
pub struct PoseSlot {
    latest: Cell<Option<HeadEuler>>,
}

impl PoseSlot {
    pub fn submit(&self, estimate: HeadEuler) {
        self.latest.set(Some(estimate));
    }

    pub fn take(&self) -> Option<HeadEuler> {
        self.latest.take()
    }

    pub fn peek(&self) -> Option<HeadEuler> {
        self.latest.get()
    }
}

/// Everything derived from one loaded avatar.
#[derive(Debug, Clone)]
pub struct LoadedAvatar {
    pub skeleton: Skeleton,
    pub rig: Rig,
    pub bind: BindCache,
    pub pose: PoseState,
    /// Bounds in model space, before placement
    pub bounds: Aabb,
    pub placement: Placement,
    driven: Vec<NodeId>,
}

impl LoadedAvatar {
    fn new(skeleton: Skeleton, bounds: Aabb, target_height: f32) -> Self {
        let rig = Rig::resolve(&skeleton);
        let mut bind = BindCache::new();
        rig.capture_bind(&skeleton, &mut bind);
        let pose = PoseState::bind(&skeleton);

        let hips = rig
            .get(BoneRole::Hips)
            .map(|id| skeleton.bind_world_matrix(id).transform_point3(Vec3::ZERO));
        let placement = place_avatar(&bounds, hips, target_height);
        let driven = rig.driven_nodes();

        Self {
            skeleton,
            rig,
            bind,
            pose,
            bounds,
            placement,
            driven,
        }
    }

    /// Head position in world space, after placement.
    pub fn head_world(&self) -> Option<Vec3> {
        let head = self.rig.head()?;
        let model = self.pose.world_position(&self.skeleton, head);
        Some(self.placement.transform_point(model))
    }

    pub fn world_bounds(&self) -> Aabb {
        self.placement.transform_aabb(&self.bounds)
    }

    pub fn snapshot(&self) -> PoseSnapshot {
        self.pose.snapshot(&self.driven)
    }
}

/// One puppet: avatar, tracking pipeline, idle layer and UI state.
pub struct AvatarSession<R: Rng = SmallRng> {
    config: PuppetConfig,
    estimator: HeadPoseEstimator,
    smoother: OrientationSmoother,
    idle: IdleAnimator,
    rng: R,
    slot: PoseSlot,
    avatar: Option<LoadedAvatar>,
    /// Time of the last tick that applied an estimate
    last_applied: Option<f32>,
    tracking: bool,
    status: TrackingStatus,
    start: StartControl,
    instructions: InstructionPanel,
    viewport: Viewport,
    framing: CameraFraming,
}

impl AvatarSession<SmallRng> {
    /// New session with an OS-seeded RNG.
    pub fn new(config: PuppetConfig) -> Result<Self> {
        Self::with_rng(config, SmallRng::from_os_rng())
    }
}

impl<R: Rng> AvatarSession<R> {
    pub fn with_rng(config: PuppetConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let viewport = Viewport::default();
        let placeholder = Aabb::new(Vec3::ZERO, Vec3::new(0.0, config.framing.target_height, 0.0));
        let framing = frame_camera(&config.framing, None, &placeholder, viewport.aspect());

        Ok(Self {
            estimator: HeadPoseEstimator::new(config.head_pose.clone()),
            smoother: OrientationSmoother::new(config.smoothing),
            idle: IdleAnimator::new(config.idle.clone()),
            config,
            rng,
            slot: PoseSlot::default(),
            avatar: None,
            last_applied: None,
            tracking: false,
            status: TrackingStatus::Booting,
            start: StartControl::default(),
            instructions: InstructionPanel::default(),
            viewport,
            framing,
        })
    }

    pub fn config(&self) -> &PuppetConfig {
        &self.config
    }

    /// Take a loaded skeleton snapshot: resolve the rig, place the avatar and
    /// frame the camera.
    pub fn load_avatar(&mut self, desc: SkeletonDesc, bounds: Aabb) -> Result<()> {
        let skeleton = match Skeleton::from_desc(desc) {
            Ok(skeleton) => skeleton,
            Err(err) => {
                self.fail_avatar_load(&err.to_string());
                return Err(err);
            }
        };

        let avatar = LoadedAvatar::new(skeleton, bounds, self.config.framing.target_height);
        let head_found = avatar.rig.head().is_some();
        log::info!(
            "Avatar loaded: {} nodes, scale {:.4}, head {}",
            avatar.skeleton.len(),
            avatar.placement.scale,
            if head_found { "found" } else { "missing" }
        );

        self.avatar = Some(avatar);
        self.status = TrackingStatus::AvatarLoaded { head_found };
        self.reframe();
        Ok(())
    }

    /// Record that the host could not load the avatar asset.
    pub fn fail_avatar_load(&mut self, reason: &str) {
        log::error!("{}", Error::AssetLoad(reason.to_string()));
        self.avatar = None;
        self.status = TrackingStatus::AvatarLoadFailed;
    }

    pub fn avatar(&self) -> Option<&LoadedAvatar> {
        self.avatar.as_ref()
    }

    pub fn rig(&self) -> Option<&Rig> {
        self.avatar.as_ref().map(|a| &a.rig)
    }

    pub fn slot(&self) -> &PoseSlot {
        &self.slot
    }

    /// Inference callback: estimate from the first detected face and publish it.
    ///
    /// Returns the published estimate. Nothing is published while tracking
    /// is stopped, when no face was detected, or when the landmarks are unusable.
    pub fn on_face_results<F: AsRef<[Landmark]>>(&mut self, faces: &[F]) -> Option<HeadEuler> {
        if !self.tracking {
            return None;
        }
        let face = FaceLandmarks::new(faces.first()?.as_ref())?;
        let estimate = self.estimator.estimate(&face)?;
        self.slot.submit(estimate);
        Some(estimate)
    }

    /// Per-frame update at `time` seconds: apply the pending head estimate,
    /// then run the idle layer.
    ///
    /// The smoothing step spans the time since the previous applied estimate,
    /// so the head converges at the same rate whatever the render rate.
    ///
    /// Returns the pose to hand to the renderer, or None before an avatar is loaded.
    pub fn tick(&mut self, time: f32) -> Option<PoseSnapshot> {
        let pending = self.slot.take();
        let avatar = self.avatar.as_mut()?;

        if let Some(estimate) = pending {
            let dt = self
                .last_applied
                .map_or(DEFAULT_FRAME_DT, |last| (time - last).max(0.0));
            self.last_applied = Some(time);

            let target = estimate.to_quat();
            match avatar.rig.head() {
                Some(head) => {
                    let current = avatar.pose.rotation(head);
                    avatar.pose.set_rotation(head, self.smoother.step(current, target, dt));
                }
                None => {
                    let current = avatar.pose.root_rotation;
                    avatar.pose.root_rotation = self.smoother.step(current, target, dt);
                }
            }
        }

        self.idle.update(
            time,
            &avatar.skeleton,
            &avatar.rig,
            &mut avatar.pose,
            &mut self.rng,
        );

        Some(avatar.snapshot())
    }

    pub fn status(&self) -> &TrackingStatus {
        &self.status
    }

    pub fn start_control(&self) -> StartControl {
        self.start
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Start button pressed. Returns false if the press must be ignored.
    pub fn begin_start(&mut self) -> bool {
        if !self.start.begin() {
            return false;
        }
        self.status = TrackingStatus::RequestingCamera;
        true
    }

    pub fn camera_started(&mut self) {
        self.start.succeed();
        self.tracking = true;
        self.status = TrackingStatus::TrackingActive;
        log::info!("Tracking active");
    }

    pub fn camera_failed(&mut self, message: &str) {
        log::error!("{}", Error::Tracking(message.to_string()));
        self.start.fail();
        self.tracking = false;
        self.status = TrackingStatus::CameraFailed(message.to_string());
    }

    /// Camera capture halted: drop any unconsumed estimate and allow a restart.
    pub fn stop_tracking(&mut self) {
        self.tracking = false;
        self.slot.take();
        self.last_applied = None;
        self.start.reset();
        self.status = match &self.avatar {
            Some(avatar) => TrackingStatus::AvatarLoaded {
                head_found: avatar.rig.head().is_some(),
            },
            None => TrackingStatus::Booting,
        };
    }

    /// Take the next face as the neutral pitch.
    pub fn recalibrate(&mut self) {
        self.estimator.reset_calibration();
    }

    pub fn instructions(&self) -> InstructionPanel {
        self.instructions
    }

    pub fn dismiss_instructions(&mut self) {
        self.instructions.dismiss();
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Container resized: update the viewport and reframe the camera.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.reframe();
    }

    pub fn framing(&self) -> &CameraFraming {
        &self.framing
    }

    pub fn placement(&self) -> Placement {
        self.avatar.as_ref().map_or(Placement::IDENTITY, |a| a.placement)
    }

    fn reframe(&mut self) {
        let aspect = self.viewport.aspect();
        match &self.avatar {
            Some(avatar) => {
                self.framing = frame_camera(
                    &self.config.framing,
                    avatar.head_world(),
                    &avatar.world_bounds(),
                    aspect,
                );
            }
            None => self.framing.aspect = aspect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::head_pose::tests::{face, neutral_face};
    use crate::math::{Quat, angle_between};
    use crate::skeleton::tests::humanoid_desc;
    use crate::smoothing::SmoothingMode;
    use rand::rngs::StdRng;

    fn session() -> AvatarSession<StdRng> {
        AvatarSession::with_rng(PuppetConfig::default(), StdRng::seed_from_u64(11)).unwrap()
    }

    fn body_bounds() -> Aabb {
        Aabb::new(Vec3::new(-0.3, 0.0, -0.15), Vec3::new(0.3, 1.8, 0.15))
    }

    fn tracking_session() -> AvatarSession<StdRng> {
        let mut s = session();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        assert!(s.begin_start());
        s.camera_started();
        s
    }

    fn head_rotation(s: &AvatarSession<StdRng>) -> Quat {
        let avatar = s.avatar().unwrap();
        avatar.pose.rotation(avatar.rig.head().unwrap())
    }

    #[test]
    fn test_slot_keeps_latest_only() {
        let slot = PoseSlot::default();
        slot.submit(HeadEuler { pitch: 0.1, ..Default::default() });
        slot.submit(HeadEuler { pitch: 0.2, ..Default::default() });
        assert_eq!(slot.peek().unwrap().pitch, 0.2);
        assert_eq!(slot.take().unwrap().pitch, 0.2);
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_neutral_face_end_to_end() {
        let mut s = tracking_session();
        let points = neutral_face();

        for frame in 0..10 {
            let e = s.on_face_results(&[&points[..]]).unwrap();
            assert!(e.pitch.abs() < 1e-6 && e.yaw.abs() < 1e-6 && e.roll.abs() < 1e-6);
            s.tick(frame as f32 / 60.0).unwrap();
        }
        assert!(angle_between(head_rotation(&s), Quat::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_head_eases_toward_estimate() {
        let mut s = tracking_session();
        s.on_face_results(&[neutral_face()]);
        s.tick(0.0);

        // Nose shifted right: positive yaw
        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);
        let target = s.on_face_results(&[turned.clone()]).unwrap().to_quat();
        assert!(target != Quat::IDENTITY);
        s.tick(1.0 / 60.0);

        // One fixed-blend step covers 15% of the way
        let full = angle_between(Quat::IDENTITY, target);
        let moved = angle_between(Quat::IDENTITY, head_rotation(&s));
        assert!((moved / full - 0.15).abs() < 1e-3, "moved {} of {}", moved, full);

        let mut prev = angle_between(head_rotation(&s), target);
        for frame in 2..200 {
            s.on_face_results(&[turned.clone()]);
            s.tick(frame as f32 / 60.0);
            let now = angle_between(head_rotation(&s), target);
            assert!(now <= prev + 1e-6);
            prev = now;
        }
        assert!(prev < 1e-3);
    }

    /// Head angle left to the target after `camera_frames` estimates at 30 Hz,
    /// rendered at `render_hz`.
    fn remaining_after(render_hz: u32, camera_frames: u32) -> (f32, f32) {
        let mut config = PuppetConfig::default();
        config.smoothing.mode = SmoothingMode::TimeConstant { tau: 0.1 };
        let mut s = AvatarSession::with_rng(config, StdRng::seed_from_u64(11)).unwrap();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        s.begin_start();
        s.camera_started();

        // First face only calibrates the neutral pitch
        s.on_face_results(&[neutral_face()]);
        s.slot().take();

        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);
        let per_camera_frame = render_hz / 30;
        let mut target = Quat::IDENTITY;
        for frame in 0..camera_frames * per_camera_frame {
            if frame % per_camera_frame == 0 {
                target = s.on_face_results(&[turned.clone()]).unwrap().to_quat();
            }
            s.tick(frame as f32 / render_hz as f32);
        }
        (
            angle_between(head_rotation(&s), target),
            angle_between(Quat::IDENTITY, target),
        )
    }

    #[test]
    fn test_time_constant_independent_of_render_rate() {
        let (at_30, full) = remaining_after(30, 8);
        let (at_60, _) = remaining_after(60, 8);
        let (at_120, _) = remaining_after(120, 8);

        // First step spans the default interval, the rest one camera frame each
        let keep = |dt: f32| (-dt / 0.1).exp();
        let expected = full * keep(DEFAULT_FRAME_DT) * keep(1.0 / 30.0).powi(7);
        for remaining in [at_30, at_60, at_120] {
            assert!(
                (remaining - expected).abs() < 0.02 * expected,
                "remaining {} expected {}",
                remaining,
                expected
            );
        }
    }

    #[test]
    fn test_stop_tracking_resets_step_interval() {
        let mut config = PuppetConfig::default();
        config.smoothing.mode = SmoothingMode::TimeConstant { tau: 0.1 };
        let mut s = AvatarSession::with_rng(config, StdRng::seed_from_u64(3)).unwrap();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        s.begin_start();
        s.camera_started();
        s.on_face_results(&[neutral_face()]);
        s.tick(0.0);

        s.stop_tracking();
        s.begin_start();
        s.camera_started();

        // After a long pause the first step is a single default frame, not a jump
        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);
        let target = s.on_face_results(&[turned]).unwrap().to_quat();
        s.tick(10.0);
        let full = angle_between(Quat::IDENTITY, target);
        let moved = angle_between(Quat::IDENTITY, head_rotation(&s));
        let alpha = 1.0 - (-DEFAULT_FRAME_DT / 0.1).exp();
        assert!((moved / full - alpha).abs() < 1e-3, "moved {} of {}", moved, full);
    }

    #[test]
    fn test_no_face_leaves_head_but_runs_idle() {
        let mut s = tracking_session();
        let empty: [Vec<Landmark>; 0] = [];
        assert!(s.on_face_results(&empty).is_none());
        assert!(s.on_face_results(&[Vec::<Landmark>::new()]).is_none());

        s.tick(0.5).unwrap();
        assert_eq!(head_rotation(&s), Quat::IDENTITY);
        let avatar = s.avatar().unwrap();
        let eye = avatar.rig.get(BoneRole::LeftEye).unwrap();
        assert_ne!(avatar.pose.rotation(eye), Quat::IDENTITY);
    }

    #[test]
    fn test_only_first_face_is_used() {
        let mut s = tracking_session();
        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);
        let e = s.on_face_results(&[neutral_face(), turned]).unwrap();
        assert!(e.yaw.abs() < 1e-6);
    }

    #[test]
    fn test_results_ignored_when_not_tracking() {
        let mut s = session();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        assert!(s.on_face_results(&[neutral_face()]).is_none());

        let mut s = tracking_session();
        s.on_face_results(&[neutral_face()]);
        s.stop_tracking();
        assert!(s.slot().peek().is_none());
        assert!(!s.is_tracking());
        assert!(s.start_control().is_enabled());
    }

    #[test]
    fn test_root_fallback_without_head() {
        let mut s = session();
        let desc = SkeletonDesc {
            nodes: vec![crate::skeleton::tests::bone("Hips", None, [0.0, 1.0, 0.0])],
        };
        s.load_avatar(desc, body_bounds()).unwrap();
        assert_eq!(
            s.status().to_string(),
            "Avatar loaded (NO HEAD BONE). Check console."
        );
        s.begin_start();
        s.camera_started();

        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);
        s.on_face_results(&[neutral_face()]);
        s.on_face_results(&[turned]);
        let snap = s.tick(0.0).unwrap();
        assert_ne!(s.avatar().unwrap().pose.root_rotation, Quat::IDENTITY);
        assert_eq!(snap.root_rotation, s.avatar().unwrap().pose.root_rotation.to_array());
    }

    #[test]
    fn test_tick_before_load() {
        let mut s = session();
        assert!(s.tick(0.0).is_none());
        assert_eq!(s.placement(), Placement::IDENTITY);
    }

    #[test]
    fn test_start_flow_and_status() {
        let mut s = session();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        assert_eq!(
            s.status().to_string(),
            "Avatar loaded (Head found). Click Start Camera"
        );

        assert!(s.begin_start());
        assert_eq!(s.status().to_string(), "Requesting camera…");
        assert!(!s.begin_start());

        s.camera_failed("NotAllowedError");
        assert_eq!(s.status().to_string(), "Camera failed: NotAllowedError");
        assert!(s.start_control().is_enabled());

        assert!(s.begin_start());
        s.camera_started();
        assert_eq!(s.status().to_string(), "Tracking active");
        assert!(!s.begin_start());
    }

    #[test]
    fn test_invalid_skeleton_sets_failure() {
        let mut s = session();
        let mut desc = humanoid_desc();
        desc.nodes[0].parent = Some(99);
        assert!(s.load_avatar(desc, body_bounds()).is_err());
        assert_eq!(*s.status(), TrackingStatus::AvatarLoadFailed);
        assert_eq!(s.status().to_string(), "Failed to load avatar.glb");
        assert!(s.avatar().is_none());
    }

    #[test]
    fn test_load_places_and_frames_head() {
        let mut s = session();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        let avatar = s.avatar().unwrap();

        let placed = avatar.world_bounds();
        assert!(placed.min.y.abs() < 1e-5);
        assert!((placed.size().y - 1.6).abs() < 1e-5);

        let head = avatar.head_world().unwrap();
        let framing = s.framing();
        assert!((framing.target.y - (head.y + 0.08)).abs() < 1e-5);
        assert!(framing.eye.z > framing.target.z);
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut s = session();
        s.load_avatar(humanoid_desc(), body_bounds()).unwrap();
        s.resize(1280.0, 720.0);
        assert_eq!(s.viewport(), Viewport { width: 1280, height: 720 });
        assert!((s.framing().aspect - 16.0 / 9.0).abs() < 1e-5);
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = tracking_session();
        let mut b = tracking_session();
        let turned = face((0.4, 0.45), (0.6, 0.45), (0.55, 0.45), 0.01, 0.01);

        a.on_face_results(&[neutral_face()]);
        a.on_face_results(&[turned]);
        for frame in 0..30 {
            let t = frame as f32 / 60.0;
            let sa = a.tick(t).unwrap();
            let sb = b.tick(t).unwrap();
            // Same seed, same idle motion
            assert_eq!(sa.morphs.len(), sb.morphs.len());
        }
        assert_ne!(head_rotation(&a), head_rotation(&b));
        let eye_a = a.avatar().unwrap().rig.get(BoneRole::LeftEye).unwrap();
        assert_eq!(
            a.avatar().unwrap().pose.rotation(eye_a),
            b.avatar().unwrap().pose.rotation(eye_a)
        );
    }

    #[test]
    fn test_recalibrate_takes_new_neutral() {
        let mut s = tracking_session();
        s.on_face_results(&[neutral_face()]);
        // Tilted forward relative to the first frame
        let tilted = face((0.4, 0.45), (0.6, 0.45), (0.5, 0.45), 0.05, 0.01);
        assert!(s.on_face_results(&[tilted.clone()]).unwrap().pitch.abs() > 0.1);

        s.recalibrate();
        let e = s.on_face_results(&[tilted]).unwrap();
        assert!(e.pitch.abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PuppetConfig::default();
        config.idle.blink_duration = -1.0;
        let result = AvatarSession::with_rng(config, StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Height the avatar is scaled to, in world units
pub const TARGET_HEIGHT: f32 = 1.6;

/// Floor for the bounding-box height when computing the placement scale
const MIN_BOUNDS_HEIGHT: f32 = 1e-3;

/// Floor for tan(fov/2) so a degenerate FOV never divides by zero
const MIN_HALF_FOV_TAN: f32 = 1e-4;

/// Axis-aligned bounding box of the avatar, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Uniform scale and translation applied to the avatar root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub translation: Vec3,
}

impl Placement {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translation: Vec3::ZERO,
    };

    #[inline]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        p * self.scale + self.translation
    }

    pub fn transform_aabb(&self, b: &Aabb) -> Aabb {
        Aabb::new(self.transform_point(b.min), self.transform_point(b.max))
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// Scale the avatar to `target_height`, stand it on y = 0 and centre it on x/z.
///
/// `hips` is the hips bone position in model space. When given, x/z centring
/// snaps to the hips instead of the box centre.
pub fn place_avatar(bounds: &Aabb, hips: Option<Vec3>, target_height: f32) -> Placement {
    let scale = target_height / bounds.size().y.max(MIN_BOUNDS_HEIGHT);

    let scaled = Placement {
        scale,
        translation: Vec3::ZERO,
    }
    .transform_aabb(bounds);
    let center = scaled.center();
    let mut placement = Placement {
        scale,
        translation: Vec3::new(-center.x, -scaled.min.y, -center.z),
    };

    if let Some(hips) = hips {
        let world = placement.transform_point(hips);
        placement.translation.x -= world.x;
        placement.translation.z -= world.z;
    }

    placement
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Vertical field of view in degrees
    pub fov_y_deg: f32,
    pub target_height: f32,
    /// Padding around the whole body when no head is resolved
    pub body_pad: f32,
    /// Height framed around the head
    pub head_height: f32,
    pub head_pad: f32,
    /// Target lift above the head bone, for headroom
    pub head_lift: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            target_height: TARGET_HEIGHT,
            body_pad: 1.6,
            head_height: 0.5,
            head_pad: 1.3,
            head_lift: 0.08,
            near: 0.01,
            far: 100.0,
        }
    }
}

/// Fixed camera looking down -Z at the framed target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFraming {
    pub eye: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraFraming {
    pub fn distance(&self) -> f32 {
        self.eye.distance(self.target)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, self.near, self.far)
    }
}

/// Frame the head when one is resolved, otherwise the whole body.
///
/// `head` and `bounds` are in world space, after placement.
pub fn frame_camera(
    config: &FramingConfig,
    head: Option<Vec3>,
    bounds: &Aabb,
    aspect: f32,
) -> CameraFraming {
    let (target, height, pad) = match head {
        Some(head) => (
            head + Vec3::new(0.0, config.head_lift, 0.0),
            config.head_height,
            config.head_pad,
        ),
        None => {
            let c = bounds.center();
            (
                Vec3::new(c.x, config.target_height * 0.55, c.z),
                config.target_height,
                config.body_pad,
            )
        }
    };

    let fov_y = config.fov_y_deg.to_radians();
    let half = height * 0.5 * pad;
    let distance = half / (fov_y * 0.5).tan().max(MIN_HALF_FOV_TAN);

    CameraFraming {
        eye: target + Vec3::Z * distance,
        target,
        fov_y,
        aspect,
        near: config.near,
        far: config.far,
    }
}

/// Render surface size in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

impl Viewport {
    /// Resize to the container's CSS size, floored and never below one pixel.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = floor_px(width);
        self.height = floor_px(height);
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

fn floor_px(v: f64) -> u32 {
    if v.is_finite() {
        v.floor().clamp(1.0, u32::MAX as f64) as u32
    } else {
        1
    }
}


#[cfg(target_arch = "wasm32")]
use crate::api::AvatarPuppet;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
impl AvatarPuppet {
    /// Column-major view matrix of the framed camera
    pub fn view_matrix(&self) -> Vec<f32> {
        self.session.framing().view_matrix().to_cols_array().to_vec()
    }

    /// Column-major projection matrix of the framed camera
    pub fn projection_matrix(&self) -> Vec<f32> {
        self.session.framing().projection_matrix().to_cols_array().to_vec()
    }

    /// Camera eye position `[x, y, z]`
    pub fn camera_eye(&self) -> Vec<f32> {
        self.session.framing().eye.to_array().to_vec()
    }

    /// Camera look-at target `[x, y, z]`
    pub fn camera_target(&self) -> Vec<f32> {
        self.session.framing().target.to_array().to_vec()
    }

    /// Eye-to-target distance, for clamping orbit controls
    pub fn camera_distance(&self) -> f32 {
        self.session.framing().distance()
    }

    /// Root placement as a column-major model matrix
    pub fn avatar_matrix(&self) -> Vec<f32> {
        self.session.placement().matrix().to_cols_array().to_vec()
    }
}

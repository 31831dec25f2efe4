//! Face-tracked avatar puppet - Wasm core
//!
//! Head pose estimation from face-mesh landmarks, orientation smoothing and
//! procedural idle motion for a rigged avatar. Rendering, model decoding and
//! landmark inference stay in the host page; this crate turns their outputs
//! into bone rotations and morph weights.

pub mod animation;
pub mod bone;
pub mod camera;
pub mod config;
pub mod error;
pub mod head_pose;
#[cfg(feature = "arm-ik")]
pub mod ik;
pub mod landmark;
pub mod math;
pub mod rig;
pub mod skeleton;
pub mod smoothing;
pub mod state;
pub mod status;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        mod api;
        pub use api::AvatarPuppet;
    }
}

pub use config::PuppetConfig;
pub use error::{Error, Result};
pub use head_pose::{HeadEuler, HeadPoseEstimator};
pub use landmark::Landmark;
pub use rig::Rig;
pub use skeleton::{Skeleton, SkeletonDesc};
pub use state::{AvatarSession, PoseSlot};

//! Facial landmarks as delivered by the face-mesh detector.
//!
//! Coordinates are normalized to the video frame; `z` is depth relative to
//! the face plane (smaller is closer to the camera).

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::error::{Error, Result};

/// Number of points in the canonical face-mesh topology
pub const FACE_MESH_LANDMARK_COUNT: usize = 468;

/// Indices into the canonical topology used by the head pose estimator.
pub mod index {
    pub const NOSE_TIP: usize = 1;
    pub const FOREHEAD: usize = 10;
    pub const LEFT_EYE_OUTER: usize = 33;
    pub const CHIN: usize = 152;
    pub const RIGHT_EYE_OUTER: usize = 263;
}

const_assert!(index::NOSE_TIP < FACE_MESH_LANDMARK_COUNT);
const_assert!(index::FOREHEAD < FACE_MESH_LANDMARK_COUNT);
const_assert!(index::LEFT_EYE_OUTER < FACE_MESH_LANDMARK_COUNT);
const_assert!(index::CHIN < FACE_MESH_LANDMARK_COUNT);
const_assert!(index::RIGHT_EYE_OUTER < FACE_MESH_LANDMARK_COUNT);

/// Values per landmark in a flat buffer (x, y, z)
pub const VALUES_PER_LANDMARK: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Borrowed view over one face's landmarks.
#[derive(Debug, Clone, Copy)]
pub struct FaceLandmarks<'a> {
    points: &'a [Landmark],
}

impl<'a> FaceLandmarks<'a> {
    /// Returns None for an empty detection.
    pub fn new(points: &'a [Landmark]) -> Option<Self> {
        if points.is_empty() {
            None
        } else {
            Some(Self { points })
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Unpack an interleaved `[x0, y0, z0, x1, ...]` buffer.
pub fn landmarks_from_flat(values: &[f32]) -> Result<Vec<Landmark>> {
    if values.len() % VALUES_PER_LANDMARK != 0 {
        return Err(Error::LandmarkCount {
            expected: values.len() - values.len() % VALUES_PER_LANDMARK + VALUES_PER_LANDMARK,
            actual: values.len(),
        });
    }

    Ok(values
        .chunks_exact(VALUES_PER_LANDMARK)
        .map(|c| Landmark::new(c[0], c[1], c[2]))
        .collect())
}

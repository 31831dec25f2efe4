use serde::Serialize;

use crate::math::{Mat4, Quat, Vec3};
use crate::skeleton::{NodeId, Skeleton};

/// Mutable animation state layered over an immutable [`Skeleton`].
///
/// Holds the current local rotation and scale of every node, the morph
/// influences of every mesh, and the rotation of the avatar as a whole
/// (used when no head bone exists).
#[derive(Debug, Clone)]
pub struct PoseState {
    pub root_rotation: Quat,
    local_rotations: Vec<Quat>,
    local_scales: Vec<Vec3>,
    morph_weights: Vec<Vec<f32>>,
}

impl PoseState {
    /// Bind pose of `skeleton`: every node at its authored transform.
    pub fn bind(skeleton: &Skeleton) -> Self {
        let ids = (0..skeleton.len()).filter_map(|i| skeleton.get(i));
        let mut local_rotations = Vec::with_capacity(skeleton.len());
        let mut local_scales = Vec::with_capacity(skeleton.len());
        let mut morph_weights = Vec::with_capacity(skeleton.len());
        for id in ids {
            let node = skeleton.node(id);
            local_rotations.push(node.rotation);
            local_scales.push(node.scale);
            morph_weights.push(vec![0.0; node.morph_targets.len()]);
        }

        Self {
            root_rotation: Quat::IDENTITY,
            local_rotations,
            local_scales,
            morph_weights,
        }
    }

    #[inline]
    pub fn rotation(&self, id: NodeId) -> Quat {
        self.local_rotations[id.index()]
    }

    #[inline]
    pub fn set_rotation(&mut self, id: NodeId, rotation: Quat) {
        self.local_rotations[id.index()] = rotation;
    }

    #[inline]
    pub fn scale(&self, id: NodeId) -> Vec3 {
        self.local_scales[id.index()]
    }

    #[inline]
    pub fn set_scale(&mut self, id: NodeId, scale: Vec3) {
        self.local_scales[id.index()] = scale;
    }

    pub fn morph_weights(&self, id: NodeId) -> &[f32] {
        &self.morph_weights[id.index()]
    }

    /// Set one morph influence; out-of-range channels are ignored.
    pub fn set_morph_weight(&mut self, id: NodeId, channel: usize, weight: f32) {
        if let Some(w) = self.morph_weights[id.index()].get_mut(channel) {
            *w = weight;
        }
    }

    /// World matrix of `id` under the current pose, including the avatar root rotation.
    pub fn world_matrix(&self, skeleton: &Skeleton, id: NodeId) -> Mat4 {
        let local = skeleton.local_matrix(id, self.rotation(id), self.scale(id));
        match skeleton.node(id).parent {
            Some(parent) => self.world_matrix(skeleton, parent) * local,
            None => Mat4::from_quat(self.root_rotation) * local,
        }
    }

    pub fn world_position(&self, skeleton: &Skeleton, id: NodeId) -> Vec3 {
        self.world_matrix(skeleton, id).transform_point3(Vec3::ZERO)
    }

    /// World rotation of the space `id` is expressed in (its parent's world rotation).
    pub fn parent_world_rotation(&self, skeleton: &Skeleton, id: NodeId) -> Quat {
        match skeleton.node(id).parent {
            Some(parent) => {
                let (_, rotation, _) = self
                    .world_matrix(skeleton, parent)
                    .to_scale_rotation_translation();
                rotation
            }
            None => self.root_rotation,
        }
    }

    /// Convert a world-space point into the parent space of `id`.
    pub fn to_parent_space(&self, skeleton: &Skeleton, id: NodeId, world: Vec3) -> Vec3 {
        let parent_world = match skeleton.node(id).parent {
            Some(parent) => self.world_matrix(skeleton, parent),
            None => Mat4::from_quat(self.root_rotation),
        };
        parent_world.inverse().transform_point3(world)
    }

    /// Serializable view of the given nodes for the host renderer.
    pub fn snapshot(&self, nodes: &[NodeId]) -> PoseSnapshot {
        let mut bones = Vec::new();
        let mut morphs = Vec::new();
        for &id in nodes {
            let weights = self.morph_weights(id);
            if weights.is_empty() {
                bones.push(BoneTransform {
                    node: id.index(),
                    rotation: self.rotation(id).to_array(),
                    scale: self.scale(id).to_array(),
                });
            } else {
                morphs.push(MorphWeights {
                    node: id.index(),
                    weights: weights.to_vec(),
                });
            }
        }

        PoseSnapshot {
            root_rotation: self.root_rotation.to_array(),
            bones,
            morphs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BoneTransform {
    pub node: usize,
    /// `[x, y, z, w]`
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

#[derive(Debug, Clone, Serialize)]
pub struct MorphWeights {
    pub node: usize,
    pub weights: Vec<f32>,
}

/// Per-frame output handed to the renderer.
#[derive(Debug, Clone, Serialize)]
pub struct PoseSnapshot {
    pub root_rotation: [f32; 4],
    pub bones: Vec<BoneTransform>,
    pub morphs: Vec<MorphWeights>,
}

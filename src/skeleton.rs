//! Skeleton snapshot of the loaded avatar.
//!
//! The host's model loader flattens its scene graph into a [`SkeletonDesc`]
//! (nodes in document order, each naming its parent). The resulting
//! [`Skeleton`] is immutable: animation writes go to a
//! [`PoseState`](crate::bone::PoseState) instead.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::{Mat4, Quat, Vec3};

/// Stable index of a node inside its skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Bone,
    Mesh,
    #[default]
    Group,
}

/// Host-side description of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDesc {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub translation: [f32; 3],
    /// Quaternion as `[x, y, z, w]`
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Blend-shape channel names, for meshes
    #[serde(default)]
    pub morph_targets: Vec<String>,
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkeletonDesc {
    pub nodes: Vec<NodeDesc>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Bind-time local transform
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub morph_targets: Vec<String>,
}

impl Node {
    #[inline]
    pub fn is_bone(&self) -> bool {
        self.kind == NodeKind::Bone
    }
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Skeleton {
    pub fn from_desc(desc: SkeletonDesc) -> Result<Self> {
        let count = desc.nodes.len();
        if count > u32::MAX as usize {
            return Err(Error::InvalidSkeleton(format!("{} nodes", count)));
        }

        for (i, node) in desc.nodes.iter().enumerate() {
            match node.parent {
                Some(p) if p >= count => {
                    return Err(Error::InvalidSkeleton(format!(
                        "node {} ('{}') has parent {} out of range",
                        i, node.name, p
                    )));
                }
                Some(p) if p == i => {
                    return Err(Error::InvalidSkeleton(format!(
                        "node {} ('{}') is its own parent",
                        i, node.name
                    )));
                }
                _ => {}
            }
        }

        // Walking up from any node must reach a root within `count` steps
        for (i, node) in desc.nodes.iter().enumerate() {
            let mut current = node.parent;
            let mut depth = 0;
            while let Some(p) = current {
                depth += 1;
                if depth > count {
                    return Err(Error::InvalidSkeleton(format!(
                        "cycle through node {} ('{}')",
                        i, node.name
                    )));
                }
                current = desc.nodes[p].parent;
            }
        }

        let mut nodes: Vec<Node> = desc
            .nodes
            .into_iter()
            .map(|d| {
                let rotation = Quat::from_array(d.rotation);
                Node {
                    name: d.name,
                    parent: d.parent.map(|p| NodeId(p as u32)),
                    children: Vec::new(),
                    kind: d.kind,
                    translation: Vec3::from_array(d.translation),
                    rotation: if rotation.length_squared() > 1e-12 {
                        rotation.normalize()
                    } else {
                        Quat::IDENTITY
                    },
                    scale: Vec3::from_array(d.scale),
                    morph_targets: d.morph_targets,
                }
            })
            .collect();

        let mut roots = Vec::new();
        for i in 0..nodes.len() {
            let id = NodeId(i as u32);
            let parent = nodes[i].parent;
            match parent {
                Some(parent) => nodes[parent.index()].children.push(id),
                None => roots.push(id),
            }
        }

        Ok(Self { nodes, roots })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let desc: SkeletonDesc = serde_json::from_str(json)?;
        Self::from_desc(desc)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, index: usize) -> Option<NodeId> {
        (index < self.nodes.len()).then_some(NodeId(index as u32))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Depth-first pre-order over every node, children in document order.
    pub fn traverse(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    /// Bones in traversal order.
    pub fn bones(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.traverse()
            .into_iter()
            .filter(move |&id| self.node(id).is_bone())
    }

    /// First child of `id` that is a bone.
    pub fn first_bone_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).is_bone())
    }

    /// Local matrix using the given rotation and scale in place of the bind ones.
    pub fn local_matrix(&self, id: NodeId, rotation: Quat, scale: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(scale, rotation, self.node(id).translation)
    }

    /// Bind-pose world matrix (forward kinematics up the parent chain).
    pub fn bind_world_matrix(&self, id: NodeId) -> Mat4 {
        let node = self.node(id);
        let local = self.local_matrix(id, node.rotation, node.scale);
        match node.parent {
            Some(parent) => self.bind_world_matrix(parent) * local,
            None => local,
        }
    }
}

use std::collections::HashMap;

use crate::math::{EPSILON, Quat, Vec3, project_off_axis};
use crate::skeleton::{NodeId, Skeleton};

/// Bind-time data for a bone that can be aimed along its rest direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindEntry {
    /// Local rotation at bind time
    pub rotation: Quat,
    /// Unit vector from the bone toward its first bone child, in parent space
    pub rest_dir: Option<Vec3>,
    /// Bind local X axis with the rest direction projected out, in parent space
    pub rest_perp: Option<Vec3>,
}

/// Bind cache keyed by node. Entries are written once and never updated.
#[derive(Debug, Clone, Default)]
pub struct BindCache {
    entries: HashMap<NodeId, BindEntry>,
}

impl BindCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&BindEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capture the bind data of `id` from the skeleton's authored pose.
    ///
    /// Root bones are skipped, and an existing entry is kept as is.
    pub fn capture(&mut self, skeleton: &Skeleton, id: NodeId) {
        let node = skeleton.node(id);
        let Some(parent) = node.parent else {
            return;
        };
        if self.entries.contains_key(&id) {
            return;
        }

        let mut entry = BindEntry {
            rotation: node.rotation,
            rest_dir: None,
            rest_perp: None,
        };

        if let Some(child) = skeleton.first_bone_child(id) {
            let to_parent = skeleton.bind_world_matrix(parent).inverse();
            let a = to_parent.transform_point3(
                skeleton.bind_world_matrix(id).transform_point3(Vec3::ZERO),
            );
            let b = to_parent.transform_point3(
                skeleton.bind_world_matrix(child).transform_point3(Vec3::ZERO),
            );

            // Degeneracy is judged on the raw vectors, before normalizing
            let offset = b - a;
            if offset.length_squared() > EPSILON {
                let dir = offset.normalize();
                entry.rest_dir = Some(dir);

                let x_bind = node.rotation * Vec3::X;
                let perp = project_off_axis(x_bind, dir);
                if perp.length_squared() > EPSILON {
                    entry.rest_perp = Some(perp.normalize());
                }
            }
        }

        self.entries.insert(id, entry);
    }
}

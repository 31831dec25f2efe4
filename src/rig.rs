//! One-time mapping from semantic roles to skeleton nodes.
//!
//! Bone names are free text authored by whoever rigged the model, so each
//! role carries an ordered list of name predicates. For each predicate in
//! order, the first bone in traversal order that satisfies it wins. A role
//! with no match stays unresolved and whatever depends on it is skipped.

use crate::bone::{BindCache, BoneRole};
use crate::skeleton::{NodeId, NodeKind, Skeleton};

type NamePredicate = fn(&str) -> bool;

/// Substrings that mark a blend-shape channel as blink-related
pub const BLINK_KEYWORDS: [&str; 4] = ["blink", "eyesclosed", "eyeclose", "closure"];

fn is_head(n: &str) -> bool {
    n.contains("head") || n.contains("skull")
}

fn is_neck(n: &str) -> bool {
    n.contains("neck")
}

fn is_hips(n: &str) -> bool {
    n.contains("hips") || n.contains("pelvis") || n == "root"
}

fn is_spine(n: &str) -> bool {
    n.contains("spine1") || (n.contains("spine") && !n.contains("spine2"))
}

fn is_chest(n: &str) -> bool {
    n.contains("chest") || n.contains("spine2")
}

fn is_left_eye(n: &str) -> bool {
    n.contains("lefteye") || n == "eye.l" || n == "def_c_eye_l"
}

fn is_right_eye(n: &str) -> bool {
    n.contains("righteye") || n == "eye.r" || n == "def_c_eye_r"
}

fn is_left(n: &str) -> bool {
    n.contains("left") || n.ends_with(".l") || n.contains(" l") || n.contains("_l")
}

fn is_right(n: &str) -> bool {
    n.contains("right") || n.ends_with(".r") || n.contains(" r") || n.contains("_r")
}

fn is_left_upper_arm(n: &str) -> bool {
    is_left(n) && n.contains("upperarm")
}

fn is_left_arm(n: &str) -> bool {
    is_left(n) && n.contains("arm")
}

fn is_left_shoulder(n: &str) -> bool {
    is_left(n) && n.contains("shoulder")
}

fn is_left_lower_arm(n: &str) -> bool {
    is_left(n) && n.contains("lowerarm")
}

fn is_left_forearm(n: &str) -> bool {
    is_left(n) && n.contains("forearm")
}

fn is_right_upper_arm(n: &str) -> bool {
    is_right(n) && n.contains("upperarm")
}

fn is_right_arm(n: &str) -> bool {
    is_right(n) && n.contains("arm")
}

fn is_right_shoulder(n: &str) -> bool {
    is_right(n) && n.contains("shoulder")
}

fn is_right_lower_arm(n: &str) -> bool {
    is_right(n) && n.contains("lowerarm")
}

fn is_right_forearm(n: &str) -> bool {
    is_right(n) && n.contains("forearm")
}

/// Ordered candidates per role, most specific first.
const RULES: [(BoneRole, &[NamePredicate]); BoneRole::COUNT] = [
    (BoneRole::Head, &[is_head, is_neck]),
    (BoneRole::Hips, &[is_hips]),
    (BoneRole::Neck, &[is_neck]),
    (BoneRole::Spine, &[is_spine]),
    (BoneRole::Chest, &[is_chest]),
    (BoneRole::LeftEye, &[is_left_eye]),
    (BoneRole::RightEye, &[is_right_eye]),
    (
        BoneRole::LeftUpperArm,
        &[is_left_upper_arm, is_left_arm, is_left_shoulder],
    ),
    (BoneRole::LeftLowerArm, &[is_left_lower_arm, is_left_forearm]),
    (
        BoneRole::RightUpperArm,
        &[is_right_upper_arm, is_right_arm, is_right_shoulder],
    ),
    (BoneRole::RightLowerArm, &[is_right_lower_arm, is_right_forearm]),
];

/// Mesh whose blink channels drive eyelid closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkMorphs {
    pub mesh: NodeId,
    pub channels: Vec<usize>,
}

/// Resolved roles for one avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rig {
    bones: [Option<NodeId>; BoneRole::COUNT],
    pub blink: Option<BlinkMorphs>,
}

impl Rig {
    /// Resolve every role against `skeleton`.
    pub fn resolve(skeleton: &Skeleton) -> Self {
        // Lowercase once; traversal order decides ties
        let bones: Vec<(NodeId, String)> = skeleton
            .bones()
            .map(|id| (id, skeleton.node(id).name.to_lowercase()))
            .collect();

        let mut rig = Rig::default();
        for (role, predicates) in RULES.iter() {
            rig.bones[role.index()] = predicates.iter().find_map(|pred| {
                bones
                    .iter()
                    .find(|(_, name)| pred(name))
                    .map(|(id, _)| *id)
            });
        }
        rig.blink = find_blink_morphs(skeleton);

        log::info!(
            "Rig resolved: {}/{} roles, blink morphs: {}",
            rig.resolved_count(),
            BoneRole::COUNT,
            rig.blink.as_ref().map_or(0, |b| b.channels.len())
        );
        for role in BoneRole::ALL {
            if let Some(id) = rig.get(role) {
                log::debug!("  {} -> '{}'", role.name(), skeleton.node(id).name);
            }
        }
        if rig.head().is_none() {
            log::warn!("No head or neck bone found; tracking will rotate the whole avatar");
        }

        rig
    }

    #[inline]
    pub fn get(&self, role: BoneRole) -> Option<NodeId> {
        self.bones[role.index()]
    }

    pub fn head(&self) -> Option<NodeId> {
        self.get(BoneRole::Head)
    }

    /// Both eyes, or nothing.
    pub fn eyes(&self) -> Option<(NodeId, NodeId)> {
        Some((self.get(BoneRole::LeftEye)?, self.get(BoneRole::RightEye)?))
    }

    pub fn resolved_count(&self) -> usize {
        self.bones.iter().filter(|b| b.is_some()).count()
    }

    /// Capture bind data for the arm bones.
    pub fn capture_bind(&self, skeleton: &Skeleton, cache: &mut BindCache) {
        for role in BoneRole::ARMS {
            if let Some(id) = self.get(role) {
                cache.capture(skeleton, id);
            }
        }
    }

    /// Nodes the puppet writes to, deduplicated, in role order.
    pub fn driven_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = Vec::new();
        let roles = self.bones.iter().flatten().copied();
        let mesh = self.blink.as_ref().map(|b| b.mesh);
        for id in roles.chain(mesh) {
            if !nodes.contains(&id) {
                nodes.push(id);
            }
        }
        nodes
    }
}

pub fn is_blink_channel(name: &str) -> bool {
    let name = name.to_lowercase();
    BLINK_KEYWORDS.iter().any(|k| name.contains(k))
}

/// First mesh in traversal order exposing any blink channel.
fn find_blink_morphs(skeleton: &Skeleton) -> Option<BlinkMorphs> {
    skeleton.traverse().into_iter().find_map(|id| {
        let node = skeleton.node(id);
        if node.kind != NodeKind::Mesh || node.morph_targets.is_empty() {
            return None;
        }
        log::debug!("Mesh with morphs: '{}' {:?}", node.name, node.morph_targets);

        let channels: Vec<usize> = node
            .morph_targets
            .iter()
            .enumerate()
            .filter(|(_, name)| is_blink_channel(name))
            .map(|(i, _)| i)
            .collect();
        (!channels.is_empty()).then_some(BlinkMorphs { mesh: id, channels })
    })
}

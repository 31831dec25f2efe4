pub mod cache;
pub mod pose;
pub mod role;

pub use cache::*;
pub use pose::*;
pub use role::*;

#[cfg(test)]
mod tests {
    use super::*;

    use crate::math::{Quat, Vec3};
    use crate::skeleton::tests::{bone, humanoid_desc};
    use crate::skeleton::{Skeleton, SkeletonDesc};

    fn arm_skeleton() -> Skeleton {
        let mut shoulder = bone("LeftArm", Some(0), [0.2, 0.0, 0.0]);
        // Upper arm bound rotated 90 degrees about Z: local X points up
        shoulder.rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2).to_array();
        Skeleton::from_desc(SkeletonDesc {
            nodes: vec![
                bone("Chest", None, [0.0, 1.4, 0.0]),
                shoulder,
                bone("LeftForeArm", Some(1), [0.3, 0.0, 0.0]),
                bone("LeftHand", Some(2), [0.25, 0.0, 0.0]),
            ],
        })
        .unwrap()
    }

    #[test]
    fn test_role_indices_match_order() {
        for (i, role) in BoneRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn test_bind_cache_rest_direction() {
        let skeleton = arm_skeleton();
        let upper = skeleton.get(1).unwrap();
        let mut cache = BindCache::new();
        cache.capture(&skeleton, upper);

        let entry = cache.get(upper).unwrap();
        // Child sits at local +X, rotated by the bind rotation into parent +Y
        let dir = entry.rest_dir.unwrap();
        assert!(dir.abs_diff_eq(Vec3::Y, 1e-5), "dir {:?}", dir);
        assert!(entry.rotation.abs_diff_eq(skeleton.node(upper).rotation, 1e-6));

        // Bind X is parallel to the rest direction here, nothing left to project
        assert!(entry.rest_perp.is_none());
    }

    #[test]
    fn test_bind_cache_parallel_axis_has_no_perpendicular() {
        // Bind X lands on the rest direction only up to rounding
        let skeleton = arm_skeleton();
        let upper = skeleton.get(1).unwrap();
        let x_bind = skeleton.node(upper).rotation * Vec3::X;
        assert!(x_bind.abs_diff_eq(Vec3::Y, 1e-5));

        let mut cache = BindCache::new();
        cache.capture(&skeleton, upper);
        let entry = cache.get(upper).unwrap();
        assert!(entry.rest_dir.is_some());
        assert_eq!(entry.rest_perp, None);
    }

    #[test]
    fn test_bind_cache_coincident_child_has_no_direction() {
        let skeleton = Skeleton::from_desc(SkeletonDesc {
            nodes: vec![
                bone("Shoulder", None, [0.0, 1.4, 0.0]),
                bone("UpperArm", Some(0), [0.0, 0.1, 0.0]),
                bone("Twist", Some(1), [0.0, 0.0, 0.0]),
            ],
        })
        .unwrap();
        let upper = skeleton.get(1).unwrap();
        let mut cache = BindCache::new();
        cache.capture(&skeleton, upper);

        let entry = cache.get(upper).unwrap();
        assert_eq!(entry.rest_dir, None);
        assert_eq!(entry.rest_perp, None);
    }

    #[test]
    fn test_bind_cache_perpendicular_axis() {
        // Bones pointing down their local +Y, as most exporters author them
        let skeleton = Skeleton::from_desc(SkeletonDesc {
            nodes: vec![
                bone("Shoulder", None, [0.0, 1.4, 0.0]),
                bone("UpperArm", Some(0), [0.0, 0.1, 0.0]),
                bone("LowerArm", Some(1), [0.0, 0.3, 0.0]),
            ],
        })
        .unwrap();
        let upper = skeleton.get(1).unwrap();
        let mut cache = BindCache::new();
        cache.capture(&skeleton, upper);

        let entry = cache.get(upper).unwrap();
        let dir = entry.rest_dir.unwrap();
        let perp = entry.rest_perp.unwrap();
        assert!(dir.abs_diff_eq(Vec3::Y, 1e-5));
        assert!(perp.abs_diff_eq(Vec3::X, 1e-5));
        assert!(perp.dot(dir).abs() < 1e-5);
    }

    #[test]
    fn test_bind_cache_skips_roots_and_leaf_direction() {
        let skeleton = arm_skeleton();
        let mut cache = BindCache::new();
        cache.capture(&skeleton, skeleton.get(0).unwrap());
        assert!(cache.is_empty());

        let hand = skeleton.get(3).unwrap();
        cache.capture(&skeleton, hand);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(hand).unwrap().rest_dir.is_none());
    }

    #[test]
    fn test_bind_cache_first_write_wins() {
        let skeleton = arm_skeleton();
        let upper = skeleton.get(1).unwrap();
        let mut cache = BindCache::new();
        cache.capture(&skeleton, upper);
        let first = *cache.get(upper).unwrap();
        cache.capture(&skeleton, upper);
        assert_eq!(*cache.get(upper).unwrap(), first);
    }

    #[test]
    fn test_pose_world_position_follows_rotation() {
        let skeleton = Skeleton::from_desc(humanoid_desc()).unwrap();
        let mut pose = PoseState::bind(&skeleton);
        let hips = skeleton.get(0).unwrap();
        let head = skeleton.get(4).unwrap();

        // Tip the whole body forward 90 degrees about X
        pose.set_rotation(hips, Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        let pos = pose.world_position(&skeleton, head);
        assert!(pos.abs_diff_eq(Vec3::new(0.0, 1.0, 0.55), 1e-5), "pos {:?}", pos);
    }

    #[test]
    fn test_to_parent_space_roundtrip() {
        let skeleton = Skeleton::from_desc(humanoid_desc()).unwrap();
        let mut pose = PoseState::bind(&skeleton);
        pose.set_rotation(skeleton.get(1).unwrap(), Quat::from_rotation_y(0.7));
        let neck = skeleton.get(3).unwrap();

        let world = pose.world_position(&skeleton, neck);
        let local = pose.to_parent_space(&skeleton, neck, world);
        assert!(local.abs_diff_eq(skeleton.node(neck).translation, 1e-5));
    }

    #[test]
    fn test_snapshot_splits_bones_and_morphs() {
        let skeleton = Skeleton::from_json(
            r#"{ "nodes": [
                { "name": "Head", "kind": "bone" },
                { "name": "Face", "parent": 0, "kind": "mesh", "morph_targets": ["a", "b"] }
            ] }"#,
        )
        .unwrap();
        let mut pose = PoseState::bind(&skeleton);
        let face = skeleton.get(1).unwrap();
        pose.set_morph_weight(face, 1, 0.5);
        pose.set_morph_weight(face, 9, 1.0);

        let snap = pose.snapshot(&[skeleton.get(0).unwrap(), face]);
        assert_eq!(snap.bones.len(), 1);
        assert_eq!(snap.morphs.len(), 1);
        assert_eq!(snap.morphs[0].weights, vec![0.0, 0.5]);
    }
}

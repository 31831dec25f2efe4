/// Semantic role a skeleton bone can play for the puppet.
///
/// Roles are resolved once by name after load; nothing looks bones up by
/// name at animation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoneRole {
    Head = 0,
    Hips = 1,
    Neck = 2,
    Spine = 3,
    Chest = 4,
    LeftEye = 5,
    RightEye = 6,
    LeftUpperArm = 7,
    LeftLowerArm = 8,
    RightUpperArm = 9,
    RightLowerArm = 10,
}

impl BoneRole {
    /// Total number of roles
    pub const COUNT: usize = 11;

    /// Convert to array index
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const ALL: [BoneRole; Self::COUNT] = [
        BoneRole::Head,
        BoneRole::Hips,
        BoneRole::Neck,
        BoneRole::Spine,
        BoneRole::Chest,
        BoneRole::LeftEye,
        BoneRole::RightEye,
        BoneRole::LeftUpperArm,
        BoneRole::LeftLowerArm,
        BoneRole::RightUpperArm,
        BoneRole::RightLowerArm,
    ];

    /// Arm bones get a bind cache entry for aiming
    pub const ARMS: [BoneRole; 4] = [
        BoneRole::LeftUpperArm,
        BoneRole::LeftLowerArm,
        BoneRole::RightUpperArm,
        BoneRole::RightLowerArm,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BoneRole::Head => "head",
            BoneRole::Hips => "hips",
            BoneRole::Neck => "neck",
            BoneRole::Spine => "spine",
            BoneRole::Chest => "chest",
            BoneRole::LeftEye => "left_eye",
            BoneRole::RightEye => "right_eye",
            BoneRole::LeftUpperArm => "left_upper_arm",
            BoneRole::LeftLowerArm => "left_lower_arm",
            BoneRole::RightUpperArm => "right_upper_arm",
            BoneRole::RightLowerArm => "right_lower_arm",
        }
    }
}

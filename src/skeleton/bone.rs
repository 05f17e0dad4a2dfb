//! 骨骼节点

use glam::{Mat4, Quat, Vec3};

/// 骨骼节点
#[derive(Clone, Debug)]
pub struct Bone {
    pub name: String,
    /// 父骨骼索引，-1 表示根骨骼
    pub parent_index: i32,

    // 初始位置（骨架空间）
    pub initial_position: Vec3,
    // 相对于父骨骼的偏移（在 build_hierarchy 中计算）
    pub bone_offset: Vec3,

    // 动画状态
    pub animation_translate: Vec3,
    pub animation_rotate: Quat,

    // 变换结果
    pub local_transform: Mat4,
    pub global_transform: Mat4,
}

impl Bone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_index: -1,
            initial_position: Vec3::ZERO,
            bone_offset: Vec3::ZERO,
            animation_translate: Vec3::ZERO,
            animation_rotate: Quat::IDENTITY,
            local_transform: Mat4::IDENTITY,
            global_transform: Mat4::IDENTITY,
        }
    }

    /// 以父骨骼和骨架空间初始位置创建
    pub fn with_parent(name: impl Into<String>, parent_index: i32, position: Vec3) -> Self {
        let mut bone = Self::new(name);
        bone.parent_index = parent_index;
        bone.initial_position = position;
        bone
    }

    pub fn parent(&self) -> Option<usize> {
        usize::try_from(self.parent_index).ok()
    }

    /// 重置动画状态
    pub fn reset_animation(&mut self) {
        self.animation_translate = Vec3::ZERO;
        self.animation_rotate = Quat::IDENTITY;
    }

    /// 更新本地变换：平移 = bone_offset + animation_translate
    pub fn update_local_transform(&mut self) {
        let translate = self.bone_offset + self.animation_translate;
        self.local_transform = Mat4::from_rotation_translation(self.animation_rotate, translate);
    }
}

impl Default for Bone {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_bone_has_no_parent() {
        let bone = Bone::new("root");
        assert_eq!(bone.parent(), None);
        assert_eq!(Bone::with_parent("arm", 0, Vec3::Y).parent(), Some(0));
    }

    #[test]
    fn test_local_transform_combines_offset_and_animation() {
        let mut bone = Bone::new("arm");
        bone.bone_offset = Vec3::new(0.0, 1.0, 0.0);
        bone.animation_translate = Vec3::new(0.5, 0.0, 0.0);
        bone.animation_rotate = Quat::from_rotation_z(0.3);
        bone.update_local_transform();

        let (_, rotation, translation) = bone.local_transform.to_scale_rotation_translation();
        assert!((translation - Vec3::new(0.5, 1.0, 0.0)).length() < 1e-6);
        assert!(rotation.angle_between(Quat::from_rotation_z(0.3)) < 1e-5);

        bone.reset_animation();
        bone.update_local_transform();
        let translation = bone.local_transform.w_axis.truncate();
        assert!((translation - Vec3::Y).length() < 1e-6);
    }
}

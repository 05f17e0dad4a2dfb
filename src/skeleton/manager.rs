//! 骨骼管理器

use glam::{Mat4, Quat, Vec3};
use std::collections::{HashMap, HashSet};

use super::Bone;

/// 骨骼管理器
pub struct BoneManager {
    bones: Vec<Bone>,
    name_to_index: HashMap<String, usize>,
    /// 父骨骼排在子骨骼之前
    sorted_indices: Vec<usize>,
    /// 物理驱动的骨骼索引集合（这些骨骼的变换由物理系统控制，不应被普通骨骼更新覆盖）
    physics_bone_indices: HashSet<usize>,
}

impl BoneManager {
    pub fn new() -> Self {
        Self {
            bones: Vec::new(),
            name_to_index: HashMap::new(),
            sorted_indices: Vec::new(),
            physics_bone_indices: HashSet::new(),
        }
    }

    /// 设置物理骨骼索引集合
    pub fn set_physics_bone_indices(&mut self, indices: HashSet<usize>) {
        self.physics_bone_indices = indices;
    }

    /// 清除物理骨骼索引集合
    pub fn clear_physics_bone_indices(&mut self) {
        self.physics_bone_indices.clear();
    }

    pub fn is_physics_bone(&self, index: usize) -> bool {
        self.physics_bone_indices.contains(&index)
    }

    /// 添加骨骼
    pub fn add_bone(&mut self, bone: Bone) -> usize {
        let index = self.bones.len();
        self.name_to_index.insert(bone.name.clone(), index);
        self.bones.push(bone);
        index
    }

    /// 构建骨骼层级：按深度排序，计算相对父骨骼的偏移和初始变换
    pub fn build_hierarchy(&mut self) {
        let bone_count = self.bones.len();
        if bone_count == 0 {
            return;
        }

        let depths: Vec<usize> = (0..bone_count).map(|i| self.depth(i)).collect();
        self.sorted_indices = (0..bone_count).collect();
        self.sorted_indices.sort_by_key(|&i| depths[i]);

        for i in 0..bone_count {
            let pos = self.bones[i].initial_position;

            // 1. 计算相对于父骨骼的偏移（用于本地变换）
            let offset = match self.valid_parent(i) {
                Some(parent) => pos - self.bones[parent].initial_position,
                None => pos,
            };
            self.bones[i].bone_offset = offset;

            // 2. 初始全局变换直接从骨架空间位置创建
            self.bones[i].global_transform = Mat4::from_translation(pos);
            self.bones[i].local_transform = Mat4::from_translation(offset);
        }
    }

    /// 层级深度；遇到环时截断
    fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.valid_parent(index);
        while let Some(parent) = current {
            depth += 1;
            if depth > self.bones.len() {
                log::warn!("[骨骼] 骨骼层级存在环: {}", self.bones[index].name);
                break;
            }
            current = self.valid_parent(parent);
        }
        depth
    }

    fn valid_parent(&self, index: usize) -> Option<usize> {
        self.bones[index]
            .parent()
            .filter(|&parent| parent < self.bones.len())
    }

    /// 通过名称查找骨骼
    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// 获取骨骼数量
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// 按索引顺序的全部骨骼名
    pub fn bone_names(&self) -> Vec<String> {
        self.bones.iter().map(|b| b.name.clone()).collect()
    }

    /// 获取骨骼
    pub fn get_bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// 获取可变骨骼引用
    pub fn get_bone_mut(&mut self, index: usize) -> Option<&mut Bone> {
        self.bones.get_mut(index)
    }

    /// 父骨骼索引
    pub fn parent_of(&self, index: usize) -> Option<usize> {
        if index >= self.bones.len() {
            return None;
        }
        self.valid_parent(index)
    }

    /// 开始更新：清空动画状态
    pub fn begin_update(&mut self) {
        for bone in &mut self.bones {
            bone.reset_animation();
        }
    }

    /// 更新骨骼变换：本地变换 → 全局变换（父骨骼先于子骨骼）
    ///
    /// 物理骨骼保留物理写入的全局变换，其子骨骼照常跟随。
    pub fn update_transforms(&mut self) {
        for position in 0..self.sorted_indices.len() {
            let idx = self.sorted_indices[position];
            if self.physics_bone_indices.contains(&idx) {
                continue;
            }
            self.bones[idx].update_local_transform();
            self.bones[idx].global_transform = match self.valid_parent(idx) {
                Some(parent) => {
                    self.bones[parent].global_transform * self.bones[idx].local_transform
                }
                None => self.bones[idx].local_transform,
            };
        }
    }

    /// 设置骨骼动画平移
    pub fn set_bone_translation(&mut self, index: usize, translation: Vec3) {
        if let Some(bone) = self.bones.get_mut(index) {
            bone.animation_translate = translation;
        }
    }

    /// 设置骨骼动画旋转
    pub fn set_bone_rotation(&mut self, index: usize, rotation: Quat) {
        if let Some(bone) = self.bones.get_mut(index) {
            bone.animation_rotate = rotation;
        }
    }

    /// 获取全局变换
    pub fn get_global_transform(&self, index: usize) -> Mat4 {
        self.bones
            .get(index)
            .map(|b| b.global_transform)
            .unwrap_or(Mat4::IDENTITY)
    }

    /// 设置全局变换（用于物理系统）
    ///
    /// 同时反推局部变换与动画状态，否则 update_local_transform() 会用动画数据覆盖物理设置的值。
    pub fn set_global_transform(&mut self, index: usize, transform: Mat4) {
        if index >= self.bones.len() {
            return;
        }

        self.bones[index].global_transform = transform;

        // local = inverse(parent_global) * global
        let local_transform = match self.valid_parent(index) {
            Some(parent) => self.bones[parent].global_transform.inverse() * transform,
            None => transform,
        };
        self.bones[index].local_transform = local_transform;

        let (_, rotation, translation) = local_transform.to_scale_rotation_translation();
        self.bones[index].animation_rotate = rotation;
        self.bones[index].animation_translate = translation - self.bones[index].bone_offset;

        self.update_children_global_transform(index);
    }

    /// 递归更新子骨骼的全局变换（不改变局部变换，跳过物理骨骼）
    fn update_children_global_transform(&mut self, parent_index: usize) {
        let parent_global = self.bones[parent_index].global_transform;

        let children: Vec<usize> = (0..self.bones.len())
            .filter(|&i| self.bones[i].parent() == Some(parent_index))
            .collect();

        for child_idx in children {
            if self.physics_bone_indices.contains(&child_idx) {
                continue;
            }
            self.bones[child_idx].global_transform =
                parent_global * self.bones[child_idx].local_transform;
            self.update_children_global_transform(child_idx);
        }
    }
}

impl Default for BoneManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// root(0,0,0) → arm(0,1,0) → hand(0,2,0)
    fn chain() -> BoneManager {
        let mut manager = BoneManager::new();
        manager.add_bone(Bone::with_parent("root", -1, Vec3::ZERO));
        manager.add_bone(Bone::with_parent("arm", 0, Vec3::new(0.0, 1.0, 0.0)));
        manager.add_bone(Bone::with_parent("hand", 1, Vec3::new(0.0, 2.0, 0.0)));
        manager.build_hierarchy();
        manager
    }

    fn origin(m: Mat4) -> Vec3 {
        m.w_axis.truncate()
    }

    #[test]
    fn test_build_hierarchy_offsets() {
        let manager = chain();
        assert_eq!(manager.bone_count(), 3);
        assert_eq!(manager.find_bone_by_name("hand"), Some(2));
        assert_eq!(manager.find_bone_by_name("tail"), None);
        let offset = manager.get_bone(2).map(|b| b.bone_offset).unwrap();
        assert!((offset - Vec3::Y).length() < 1e-6);
        assert_eq!(manager.parent_of(2), Some(1));
        assert_eq!(manager.parent_of(0), None);
    }

    #[test]
    fn test_update_propagates_parent_rotation() {
        let mut manager = chain();
        manager.begin_update();
        manager.set_bone_rotation(0, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        manager.update_transforms();

        // 根骨骼绕 Z 转 90°，子骨骼从 +Y 转到 -X
        assert!(
            (origin(manager.get_global_transform(1)) - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5
        );
        assert!(
            (origin(manager.get_global_transform(2)) - Vec3::new(-2.0, 0.0, 0.0)).length() < 1e-5
        );
    }

    #[test]
    fn test_set_global_transform_moves_children() {
        let mut manager = chain();
        manager.update_transforms();
        manager.set_global_transform(1, Mat4::from_translation(Vec3::new(3.0, 1.0, 0.0)));

        assert!(
            (origin(manager.get_global_transform(2)) - Vec3::new(3.0, 2.0, 0.0)).length() < 1e-5
        );
        let animation = manager.get_bone(1).map(|b| b.animation_translate).unwrap();
        assert!((animation - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);

        // 动画更新后保持物理写入的位置
        manager.update_transforms();
        assert!(
            (origin(manager.get_global_transform(1)) - Vec3::new(3.0, 1.0, 0.0)).length() < 1e-5
        );
    }

    #[test]
    fn test_physics_bones_keep_pose_during_update() {
        let mut manager = chain();
        manager.set_physics_bone_indices([1].into_iter().collect());
        manager.set_global_transform(1, Mat4::from_translation(Vec3::new(0.0, -5.0, 0.0)));

        manager.begin_update();
        manager.set_bone_translation(0, Vec3::new(1.0, 0.0, 0.0));
        manager.update_transforms();

        assert!((origin(manager.get_global_transform(0)) - Vec3::X).length() < 1e-5);
        assert!(
            (origin(manager.get_global_transform(1)) - Vec3::new(0.0, -5.0, 0.0)).length() < 1e-5
        );
        assert!(
            (origin(manager.get_global_transform(2)) - Vec3::new(0.0, -4.0, 0.0)).length() < 1e-5
        );

        manager.clear_physics_bone_indices();
        assert!(!manager.is_physics_bone(1));
    }
}

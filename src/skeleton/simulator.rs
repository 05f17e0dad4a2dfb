//! 物理骨骼模拟器
//!
//! 以 [`BoneManager`] 为骨架，实现物理骨骼所需的 [`BoneSimulator`]：
//! 骨骼查找、姿态读写，以及骨骼 → 物理刚体的绑定表。
//! 只有正在模拟的绑定骨骼才跳过动画更新，运动学跟随的骨骼照常由动画驱动。

use glam::Mat4;
use std::collections::{HashMap, HashSet};

use super::BoneManager;
use crate::physics::backend::BodyHandle;
use crate::physics::scene::BoneSimulator;

/// 物理骨骼模拟器
pub struct PhysicalBoneSimulator {
    bones: BoneManager,
    /// `None` 表示尚未挂到骨架上
    skeleton_transform: Option<Mat4>,
    active: bool,
    bindings: HashMap<usize, BodyHandle>,
    simulating: HashSet<usize>,
}

impl PhysicalBoneSimulator {
    pub fn new(bones: BoneManager) -> Self {
        Self {
            bones,
            skeleton_transform: None,
            active: false,
            bindings: HashMap::new(),
            simulating: HashSet::new(),
        }
    }

    pub fn bone_manager(&self) -> &BoneManager {
        &self.bones
    }

    pub fn bone_manager_mut(&mut self) -> &mut BoneManager {
        &mut self.bones
    }

    /// 挂到骨架上（或传 `None` 脱离骨架）
    pub fn set_skeleton_transform(&mut self, transform: Option<Mat4>) {
        self.skeleton_transform = transform;
    }

    pub fn set_active(&mut self, active: bool) {
        if self.active != active {
            log::info!("[骨骼模拟器] {}", if active { "激活" } else { "停用" });
        }
        self.active = active;
    }

    pub fn bound_body(&self, bone: usize) -> Option<BodyHandle> {
        self.bindings.get(&bone).copied()
    }

    pub fn bound_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_bone_simulating(&self, bone: usize) -> bool {
        self.simulating.contains(&bone)
    }

    fn sync_physics_bones(&mut self) {
        let indices: HashSet<usize> = self
            .simulating
            .iter()
            .copied()
            .filter(|bone| self.bindings.contains_key(bone))
            .collect();
        self.bones.set_physics_bone_indices(indices);
    }
}

impl BoneSimulator for PhysicalBoneSimulator {
    fn skeleton_global_transform(&self) -> Option<Mat4> {
        self.skeleton_transform
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.find_bone_by_name(name)
    }

    fn bone_names(&self) -> Vec<String> {
        self.bones.bone_names()
    }

    fn bone_global_pose(&self, bone: usize) -> Mat4 {
        self.bones.get_global_transform(bone)
    }

    fn set_bone_global_pose(&mut self, bone: usize, pose: Mat4) {
        self.bones.set_global_transform(bone, pose);
    }

    fn bind_physical_bone(&mut self, bone: usize, body: BodyHandle) {
        if let Some(old) = self.bindings.insert(bone, body) {
            if old != body {
                log::warn!("[骨骼模拟器] 骨骼 {} 已绑定 {:?}，改为 {:?}", bone, old, body);
            }
        }
        self.sync_physics_bones();
    }

    fn unbind_physical_bone(&mut self, bone: usize) {
        self.bindings.remove(&bone);
        self.simulating.remove(&bone);
        self.sync_physics_bones();
    }

    fn set_bone_simulating(&mut self, bone: usize, simulating: bool) {
        let changed = if simulating {
            self.simulating.insert(bone)
        } else {
            self.simulating.remove(&bone)
        };
        if changed {
            self.sync_physics_bones();
        }
    }

    fn physical_bone_parent(&self, bone: usize) -> Option<BodyHandle> {
        let mut current = self.bones.parent_of(bone);
        while let Some(index) = current {
            if let Some(body) = self.bindings.get(&index) {
                return Some(*body);
            }
            current = self.bones.parent_of(index);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::Bone;
    use glam::Vec3;

    fn simulator() -> PhysicalBoneSimulator {
        let mut manager = BoneManager::new();
        manager.add_bone(Bone::with_parent("root", -1, Vec3::ZERO));
        manager.add_bone(Bone::with_parent("arm", 0, Vec3::new(0.0, 1.0, 0.0)));
        manager.add_bone(Bone::with_parent("hand", 1, Vec3::new(0.0, 2.0, 0.0)));
        manager.build_hierarchy();
        PhysicalBoneSimulator::new(manager)
    }

    #[test]
    fn test_nearest_physical_parent_skips_unbound() {
        let mut sim = simulator();
        sim.bind_physical_bone(0, BodyHandle(10));
        sim.bind_physical_bone(2, BodyHandle(12));

        assert_eq!(sim.physical_bone_parent(2), Some(BodyHandle(10)));
        assert_eq!(sim.physical_bone_parent(0), None);

        sim.bind_physical_bone(1, BodyHandle(11));
        assert_eq!(sim.physical_bone_parent(2), Some(BodyHandle(11)));

        sim.unbind_physical_bone(1);
        assert_eq!(sim.physical_bone_parent(2), Some(BodyHandle(10)));
        assert_eq!(sim.physical_bone_parent(99), None);
    }

    #[test]
    fn test_only_simulating_bones_become_physics_bones() {
        let mut sim = simulator();
        sim.bind_physical_bone(1, BodyHandle(1));
        assert_eq!(sim.bound_body(1), Some(BodyHandle(1)));
        assert!(!sim.bone_manager().is_physics_bone(1));

        sim.set_bone_simulating(1, true);
        assert!(sim.bone_manager().is_physics_bone(1));

        // 未绑定的骨骼即使标记为模拟也不跳过动画
        sim.set_bone_simulating(2, true);
        assert!(!sim.bone_manager().is_physics_bone(2));

        sim.set_bone_simulating(1, false);
        assert!(!sim.bone_manager().is_physics_bone(1));

        sim.set_bone_simulating(1, true);
        sim.unbind_physical_bone(1);
        assert!(!sim.bone_manager().is_physics_bone(1));
        assert!(!sim.is_bone_simulating(1));
        assert_eq!(sim.bound_count(), 0);
    }

    #[test]
    fn test_kinematic_bound_bone_follows_animation() {
        let mut sim = simulator();
        sim.bind_physical_bone(1, BodyHandle(1));

        let bones = sim.bone_manager_mut();
        bones.update_transforms();
        bones.set_bone_rotation(0, glam::Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        bones.update_transforms();

        let arm = sim.bone_global_pose(1).w_axis.truncate();
        assert!((arm - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_skeleton_and_pose_access() {
        let mut sim = simulator();
        assert_eq!(sim.skeleton_global_transform(), None);
        assert!(!sim.is_active());

        sim.set_skeleton_transform(Some(Mat4::from_translation(Vec3::Z)));
        sim.set_active(true);
        assert!(sim.is_active());
        assert_eq!(sim.find_bone("arm"), Some(1));
        assert_eq!(sim.bone_names(), vec!["root", "arm", "hand"]);

        sim.set_bone_global_pose(1, Mat4::from_translation(Vec3::new(2.0, 1.0, 0.0)));
        let hand = sim.bone_global_pose(2).w_axis.truncate();
        assert!((hand - Vec3::new(2.0, 2.0, 0.0)).length() < 1e-5);
    }
}

//! 物理骨骼的外部协作者
//!
//! - [`BoneSimulator`]：骨架一侧（骨骼查找、姿态读写、父级物理刚体查找）
//! - [`SceneTree`]：场景对象身份与进出场景树的订阅
//! - [`BoneContext`]：每次调用注入的协作者集合

use glam::Mat4;

use super::backend::{BodyHandle, PhysicsBackend};

/// 场景对象身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// 进出场景树通知的订阅句柄
///
/// 不可复制：同一订阅只能退订一次。
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct TreeWatch(pub u64);

/// 场景树查询
pub trait SceneTree {
    /// 对象是否在场景树中；`None` 表示该对象不是场景节点（或已释放）
    fn is_inside_tree(&self, object: ObjectId) -> Option<bool>;

    /// 订阅对象的进入/退出场景树通知
    fn watch_tree(&mut self, object: ObjectId) -> TreeWatch;

    /// 退订
    fn unwatch_tree(&mut self, watch: TreeWatch);
}

/// 骨架与物理骨骼模拟器
pub trait BoneSimulator {
    /// 骨架的全局变换；`None` 表示模拟器尚未挂到骨架上
    fn skeleton_global_transform(&self) -> Option<Mat4>;

    /// 模拟器是否处于激活状态
    fn is_active(&self) -> bool;

    fn find_bone(&self, name: &str) -> Option<usize>;

    /// 全部骨骼名（用于编辑器枚举）
    fn bone_names(&self) -> Vec<String>;

    /// 骨骼在骨架空间中的姿态
    fn bone_global_pose(&self, bone: usize) -> Mat4;

    fn set_bone_global_pose(&mut self, bone: usize, pose: Mat4);

    fn bind_physical_bone(&mut self, bone: usize, body: BodyHandle);

    fn unbind_physical_bone(&mut self, bone: usize);

    /// 标记骨骼姿态是否由物理驱动；只有模拟中的骨骼跳过动画姿态更新
    fn set_bone_simulating(&mut self, bone: usize, simulating: bool);

    /// 沿骨骼层级向上查找最近的、绑定了物理刚体的祖先骨骼
    fn physical_bone_parent(&self, bone: usize) -> Option<BodyHandle>;
}

/// 单次调用注入的协作者
pub struct BoneContext<'a> {
    pub backend: &'a mut dyn PhysicsBackend,
    /// `None` 表示骨骼尚未挂到模拟器下
    pub simulator: Option<&'a mut dyn BoneSimulator>,
    pub scene: &'a mut dyn SceneTree,
}

impl<'a> BoneContext<'a> {
    pub fn new(
        backend: &'a mut dyn PhysicsBackend,
        simulator: Option<&'a mut dyn BoneSimulator>,
        scene: &'a mut dyn SceneTree,
    ) -> Self {
        Self {
            backend,
            simulator,
            scene,
        }
    }

    pub fn simulator(&self) -> Option<&(dyn BoneSimulator + 'a)> {
        self.simulator.as_deref()
    }

    pub fn simulator_mut(&mut self) -> Option<&mut (dyn BoneSimulator + 'a)> {
        self.simulator.as_deref_mut()
    }

    /// 骨架变换（仅当模拟器存在且已挂骨架）
    pub fn skeleton_transform(&self) -> Option<Mat4> {
        self.simulator
            .as_deref()
            .and_then(|sim| sim.skeleton_global_transform())
    }
}

//! 物理骨骼配置
//!
//! 所有参数扁平化，直接在代码中修改默认值即可。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// 物理配置（扁平化，不嵌套）
#[derive(Debug, Clone)]
pub struct PhysicsConfig {
    // ========== 刚体默认值 ==========
    /// 新建物理骨骼的质量，默认 1.0
    pub default_mass: f32,
    /// 新建物理骨骼的摩擦系数，默认 1.0
    pub default_friction: f32,
    /// 新建物理骨骼的弹性，默认 0.0
    pub default_bounce: f32,
    /// 新建物理骨骼的重力缩放，默认 1.0
    pub default_gravity_scale: f32,

    // ========== 接触上报 ==========
    /// 每个刚体最多上报的接触数上限，默认 4096
    /// 每个接触约占 80 字节，不宜设置过大
    pub max_contacts_reported_limit: usize,

    // ========== 区域阻尼 ==========
    /// 阻尼模式为 Combine 时叠加的线性区域阻尼，默认 0.1
    pub area_linear_damp: f32,
    /// 阻尼模式为 Combine 时叠加的角区域阻尼，默认 0.1
    pub area_angular_damp: f32,

    // ========== Rapier 后端 ==========
    /// 重力 Y 分量（负数向下），默认 -9.8
    pub gravity_y: f32,
    /// 物理 FPS，默认 60.0
    pub physics_fps: f32,
    /// 每帧最大子步数，默认 4
    pub max_substep_count: i32,
    /// 求解器迭代次数，默认 4
    pub solver_iterations: usize,

    // ========== 调试 ==========
    /// 是否输出调试日志，默认 false
    pub debug_log: bool,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            // ====== 刚体默认值 ======
            default_mass: 1.0,
            default_friction: 1.0,
            default_bounce: 0.0,
            default_gravity_scale: 1.0,

            // ====== 接触上报 ======
            max_contacts_reported_limit: 4096,

            // ====== 区域阻尼 ======
            // 相当于场景默认的空气阻力
            // Replace 模式下不叠加
            area_linear_damp: 0.1,
            area_angular_damp: 0.1,

            // ====== Rapier 后端 ======
            gravity_y: -9.8,
            // 越高 → 越稳定，但 CPU 消耗越大
            physics_fps: 60.0,
            // 帧率低于 physics_fps 时分步计算
            max_substep_count: 4,
            solver_iterations: 4,

            // ====== 调试 ======
            debug_log: false,
        }
    }
}

/// 全局配置实例
static PHYSICS_CONFIG: Lazy<RwLock<PhysicsConfig>> = Lazy::new(|| {
    RwLock::new(PhysicsConfig::default())
});

/// 获取当前配置（只读）
pub fn get_config() -> PhysicsConfig {
    PHYSICS_CONFIG
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: PhysicsConfig) {
    *PHYSICS_CONFIG
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = config;
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(PhysicsConfig::default());
}

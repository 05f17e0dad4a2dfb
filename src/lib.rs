//! Bone Physics - 骨骼物理刚体
//!
//! 把一根骨骼绑定到一个物理刚体上：
//! - 未模拟时刚体跟随骨骼动画姿态（运动学）
//! - 模拟时骨骼姿态由物理结果驱动
//! - 可选关节把刚体连接到父骨骼的刚体，组成布娃娃
//! - 接触监视：把每步接触列表转换为稳定的进入/离开事件
//!
//! 物理引擎通过 [`physics::PhysicsBackend`] 注入，默认提供 Rapier3D 实现（feature `rapier`）。

pub mod physics;
pub mod skeleton;

pub use physics::{
    ContactEvent, ContactListener, ContactMonitor, ForceIntegrator, JointData, JointType,
    PhysicalBone, PhysicsBackend, SimulationState,
};
#[cfg(feature = "rapier")]
pub use physics::RapierBackend;
pub use skeleton::{Bone, BoneManager, PhysicalBoneSimulator};

use physics::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BonePhysicsError {
    #[error("Contact monitor is locked during an in/out callback, use the deferred setter")]
    ContactMonitorLocked,

    #[error("Contact monitor is disabled")]
    ContactMonitorDisabled,

    #[error("Object {0:?} is not tracked by the contact monitor")]
    UntrackedObject(ObjectId),

    #[error("Tree notification does not match the tracked in-tree state")]
    TreeStateMismatch,

    #[error("Value out of range for {name}: {value}")]
    OutOfRange { name: &'static str, value: f32 },

    #[error("Too many contacts reported: {requested} (limit {limit})")]
    TooManyContacts { requested: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, BonePhysicsError>;
